pub mod events;
pub mod handler;

pub use events::{Effect, UiEvent};
pub use handler::{Dialogs, FormMode, Session, ViewState};
