//! Agent protocol: the layer-activation tool and the two-round dispatcher

mod cache;
mod context;
mod dispatcher;
mod prompt;
mod result;
mod tool;

pub use cache::{CacheKey, ResponseCache};
pub use context::ConversationContext;
pub use dispatcher::{
    DispatchFailure, DispatchOutcome, DispatchPhase, DispatchRequest, DispatcherConfig,
    ToolDispatcher, ToolExecution, FIRST_ROUND_FALLBACK, SECOND_ROUND_FALLBACK,
};
pub use prompt::system_instruction;
pub use result::{LayerOutcome, ToolResult};
pub use tool::{activate_layers_definition, ActivateLayersArgs, ToolArgsError, ACTIVATE_LAYERS};
