pub mod load;
pub mod types;

pub use load::{collect_extensions, collect_template_variables, load_config, validate_config};
pub use types::{Config, Options, SearchMode, Source, Suffix, Target};
