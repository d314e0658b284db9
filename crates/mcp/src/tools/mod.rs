pub mod planning;
mod registry;

pub use planning::{invoke, ToolPlanningTool, QUERY_DESCRIPTION};
pub use registry::{json_schema_object, json_schema_string, Tool, ToolRegistry};
