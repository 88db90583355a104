//! Status notifications for mode switches

mod presenter;

pub use presenter::{
    Failure, IndicatorId, NotificationPresenter, PresenterState, Status, StatusKind, StatusSink,
    TerminalSink,
};
