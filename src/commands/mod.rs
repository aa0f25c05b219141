//! CLI subcommand implementations for pushwire.
//!
//! - [`init`] - log in, register a device, store credentials
//! - [`listen`] - run the push listener and print incoming messages

pub mod init;
pub mod listen;

#[doc(inline)]
pub use init::{default_device_name, login_and_register, Prompter};
#[doc(inline)]
pub use listen::MessagePump;
