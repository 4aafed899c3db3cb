use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::SubsetConfig;

/// Emit the JSON Schema for subset config files.
pub fn config_json_schema() -> RootSchema {
    schema_for!(SubsetConfig)
}
