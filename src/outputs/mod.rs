//! Output files written after a run.
//!
//! # Submodules
//!
//! - [`manifest`]: Writes the [`DownloadReport`](crate::models::DownloadReport)
//!   of a run as JSON
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── songs/
//! │   ├── pre-existing_songs/<artist> - <title>/<no> - <version>.mp3
//! │   ├── cover_songs/
//! │   ├── commissioned_songs/
//! │   └── contest_songs/
//! ├── soundtrack/<track name>.<ext>
//! └── image/<index>.<ext>
//! ```

pub mod manifest;
