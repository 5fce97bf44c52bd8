#![deny(unsafe_code)]
//! jamcheck: a sandboxed verification harness for jam-style build tools
//!
//! jamcheck runs a real build tool (`b2`, `bjam`) inside a disposable workspace, watches which files appear and
//! disappear, and checks those changes against expectations such as "`bin/gcc/debug/` gained `a.o b.o c.o`".
//!
//! ## Layout
//!
//! - [`workspace`] - temporary directory lifecycle, file writes and fixture trees
//! - [`invoker`] - build tool subprocess with timeout and output capture
//! - [`snapshot`] - filesystem walk producing root-relative snapshots
//! - [`harness`] - the controller tying the above to `jamcheck_core`'s diffing and matching
//! - [`scenario`] - JSON scenario files driving a harness
//! - [`cli`] - the `jamcheck` binary
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` with `?` / `map_err`. The `cli` module enforces `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Example
//!
//! ```no_run
//! use jamcheck::{Harness, HarnessConfig, RunOptions};
//!
//! # fn main() -> jamcheck::HarnessResult<()> {
//! let mut t = Harness::new(HarnessConfig::default())?;
//! t.write("jamroot.jam", "")?;
//! t.write("jamfile.jam", "exe hello : hello.cpp ;\n")?;
//! t.write("hello.cpp", "int main() { return 0; }\n")?;
//! t.run_build_system(RunOptions::new())?;
//! t.expect_addition(jamcheck::ExpectedPaths::product("bin/$toolset/debug/", "hello.exe hello.obj"))?;
//! t.close();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod invoker;
pub mod scenario;
pub mod snapshot;
pub mod workspace;

pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use harness::{Harness, HarnessState, RunOptions};
pub use invoker::{BuildInvoker, ExitExpectation, InvocationRecord};
pub use workspace::Workspace;

pub use jamcheck_core::{Delta, Expectation, ExpectationFailure, ExpectedPaths, MatchMode, Snapshot};
