//! Interactive CLI chat with a character.
//!
//! This module implements the chat loop: the turn view with version
//! indicators, slash commands for editing, deleting, regenerating and
//! switching versions, the boost selector and the balance display.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
