pub mod clock;
pub mod console;
pub mod dir;
pub mod logging;
pub mod minutes;
pub mod runtime;
pub mod shutdown;
pub mod time;
