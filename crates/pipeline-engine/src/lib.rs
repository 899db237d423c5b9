pub mod capabilities;
pub mod capability;
pub mod context;
pub mod error;
pub mod genie;
pub mod router;
pub mod runner;
pub mod state;
pub mod synth;
pub mod url_loader;

pub use capability::{global_registry, CapabilityRegistry, GenieUpdate, NodeCapability, NodeUpdate};
pub use context::{build_system_prompt, PromptOptions};
pub use error::EngineError;
pub use genie::{GenieEngine, AUTO_RESPOND_MESSAGE, INTRODUCE_MESSAGE};
pub use router::{route_tool_calls, BackstoryUpdate, GenieDelivery, RoutingOutcome};
pub use runner::InferenceRunner;
pub use state::{ContextState, SharedStore};
pub use synth::{tools_for_downstream_nodes, SynthesizedTools};
pub use url_loader::{ContentFetcher, HttpContentFetcher, UrlLoader};
