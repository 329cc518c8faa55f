//! The cell directive mini-language.
//!
//! Recognizes `%arc`, `%sql` and `%sqlvalidate` on the first line of a cell
//! and parses their shell-quoted `key=value` parameters.

mod parser;

pub use parser::{
    CellDirective, Directive, DirectiveKind, classify, parse_directive, parse_pair_list, split_csv,
};
