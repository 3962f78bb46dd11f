//! Client-side runtime of the funnel demo dashboard.
//!
//! A [`FunnelSession`] consumes the ordered stream of server events, applies
//! each one to the [`store::FunnelStore`] and derives render instructions for
//! whatever surface draws the dashboard.

pub mod config;
pub mod dispatcher;
pub mod projector;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod transport;

pub use config::{ClientSettings, Timings};
pub use projector::{Counter, RenderInstruction, Trigger};
pub use runtime::{run_session, RenderSurface, SessionExit, UserAction};
pub use scheduler::{Clock, ManualClock, SystemClock};
pub use session::{FunnelSession, SessionError};
pub use transport::{connect, ChannelError, ChannelHandle, CommandSink, RecordingSink};
