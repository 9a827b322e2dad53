//! Property-based tests for rulebook extraction
//!
//! Property tests verify invariants that should hold for all inputs rather
//! than for hand-picked fixtures.
//!
//! ## Test Modules
//!
//! - `layout_props`: column divider and header splitting
//!   - A single synthetic gutter is bracketed exactly
//!   - Blocks without a column break come back as one full-width section
//!   - `before + rest` is always the input of a header split
//!
//! - `table_props`: the profile table state machine
//!   - Continuation lines extend the previous row and never add one
//!   - Extracting rendered rows yields the same rows again
//!
//! - `segmenter_props`: rule segmentation
//!   - Every generated rule comes back with its body intact
//!   - Flavor paragraphs are discarded, leaving bodiless names dropped
//!
//! ## Configuration
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable:
//!
//! ```sh
//! PROPTEST_CASES=1000 cargo test property --release
//! ```

mod layout_props;
mod segmenter_props;
mod table_props;
