//! Persistence of harvest results.
//!
//! # Submodules
//!
//! - [`json`]: per-pair link lists, the per-subject master mapping, and
//!   per-article snapshots
//! - [`csv`]: append-only delimited sinks for article rows
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── links-accounting/
//! │   ├── accounting_Artificial_Intelligence.json   # ["https://…/doi/…", …]
//! │   └── all_accounting_links.json                 # { "Artificial_Intelligence": [...] }
//!
//! articles.csv                                      # Title;Journal;DOI;…;URL
//!
//! abstracts_dir/
//! ├── merged.csv                                    # file,title,authors,abstract
//! └── articles/
//!     └── article_1.json
//! ```

pub mod csv;
pub mod json;
