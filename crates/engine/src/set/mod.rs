mod apply;
mod attributes;
mod discovery;
mod science;
mod texture;
mod types;

pub use apply::apply_set;
pub use attributes::{parse_attribute_file, AttributeField, AttributeFileError};
pub use discovery::{
    list_set_names, SetDiscoveryError, SetLayout, ATTRIBUTE_FILE_EXTENSION, MAP_FILE_EXTENSION,
    SCIENCE_RESULTS_FILE,
};
pub use science::{parse_science_results, MalformedScienceLine, ScienceParse, ScienceResultEntry};
pub use texture::{decode_biome_map, MapDecodeError};
pub use types::{
    ApplyReport, ApplySummary, RegionApplyError, RegionErrorKind, RegionOutcome,
    ScienceApplyError, ScienceOutcome,
};
