/// OS-backed implementations of the core traits: real child processes and
/// real files under the result directory.
pub mod launcher;
pub mod sink;
