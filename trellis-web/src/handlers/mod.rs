//! HTTP request handlers for the Trellis web server
//!
//! Page handlers run the route guards; API handlers drive the idle-session
//! runtime and the sign-out dialog.

pub mod health;
pub mod pages;
pub mod session;
pub mod types;

pub use health::*;
pub use pages::*;
pub use session::*;
pub use types::*;
