//! Content Blocker Filter List Compiler
//!
//! This crate turns Adblock Plus filter lists into a [`cb_core::FilterIndex`]:
//! parse the lines, apply `$badfilter` and drop duplicates, then index the
//! network rules in the trie and the selectors in the cosmetic store. List
//! metadata and checksums are read from the header block.

pub mod builder;
pub mod checksum;
pub mod header;
pub mod optimizer;
pub mod parser;

pub use builder::{build_index, compile_filter_list, CompileStats, CompiledList};
pub use checksum::{compute_checksum, verify_checksum, ChecksumStatus};
pub use header::{looks_like_filter_list, parse_header, ListHeader};
pub use optimizer::{optimize_rules, OptimizeStats};
pub use parser::{parse_filter_list, parse_rule_line, CompiledRule, CosmeticRule, ParsedLine, ParsedList, ParseStats};
