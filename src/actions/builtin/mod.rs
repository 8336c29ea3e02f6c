//! Built-in actions covering the minimum handler surface.
//!
//! | Name           | Args                               | Cleanup          |
//! |----------------|------------------------------------|------------------|
//! | `OpenUrl`      | `{url}`                            | closes the tab   |
//! | `LockScreen`   | none                               | none             |
//! | `UnlockScreen` | none (credential from the context) | none             |
//! | `ClickUI`      | `{role?, name?, class_name?}`      | none             |

mod click_ui;
mod lock_screen;
mod open_url;

pub use click_ui::ClickUi;
pub use lock_screen::{LockScreen, UnlockScreen};
pub use open_url::OpenUrl;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ActionError, SessionError};

/// Runs a session primitive unless `token` fires first.
async fn until_cancelled<T>(
    token: &CancellationToken,
    primitive: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, ActionError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ActionError::Canceled),
        res = primitive => res.map_err(ActionError::from),
    }
}
