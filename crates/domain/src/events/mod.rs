pub mod server_event;

pub use server_event::ServerEvent;
