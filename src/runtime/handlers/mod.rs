/// Built-in node handlers
///
/// Control flow (trigger, condition, switch), data shaping (set_variable,
/// transform) and generic integrations (http_request, script). Email,
/// spreadsheet and text-generation nodes have no built-in handler; their
/// providers register one on the [`HandlerRegistry`](crate::runtime::HandlerRegistry).

mod condition;
mod http;
mod script;
mod trigger;
mod variable;

pub use condition::{evaluate, loose_equals, ConditionHandler, SwitchHandler};
pub use http::HttpRequestHandler;
pub use script::ScriptHandler;
pub use trigger::TriggerHandler;
pub use variable::{SetVariableHandler, TransformHandler};
