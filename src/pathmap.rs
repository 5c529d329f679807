//! Path separator reconciliation between the editor host and the debug server.
//!
//! The CFML server may run on a different operating system than the editor;
//! stack frame paths coming back from it are rewritten so the editor can
//! resolve them against the local workspace.

use serde::Deserialize;
use strum_macros::{Display, EnumString};

/// Separator rewriting policy, configured per debug session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeparatorPolicy {
    /// Rewrite to the separator of the machine running the editor.
    #[default]
    Auto,
    Posix,
    Windows,
    /// Leave paths untouched.
    None,
}

/// Separator of the platform the editor host runs on.
pub fn host_separator() -> char {
    if cfg!(windows) { '\\' } else { '/' }
}

/// Force every `/` and `\` in `path` to the separator selected by `policy`.
///
/// `platform_default` is the separator of the *editor host* (see
/// [`host_separator`]), used by [`SeparatorPolicy::Auto`]. Total and
/// idempotent; [`SeparatorPolicy::None`] returns the input unchanged.
pub fn normalize_separators(path: &str, policy: SeparatorPolicy, platform_default: char) -> String {
    let sep = match policy {
        SeparatorPolicy::None => return path.to_string(),
        SeparatorPolicy::Posix => '/',
        SeparatorPolicy::Windows => '\\',
        SeparatorPolicy::Auto => platform_default,
    };

    path.chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect()
}
