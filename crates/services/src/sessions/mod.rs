mod controller;
mod progress;
mod view;

pub use controller::{
    ControllerState, GenerationTicket, SessionController, SubmitOutcome, UserError,
};
pub use progress::SessionProgress;
pub use view::HistoryListItem;
