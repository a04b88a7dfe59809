// SPDX-License-Identifier: MIT

//! ID helpers shared by the identity newtypes.
//!
//! Opaque caller-supplied IDs ([`GoalId`](crate::GoalId),
//! [`StepId`](crate::StepId)) and host-minted IDs
//! ([`WorkflowId`](crate::WorkflowId), [`RunId`](crate::RunId)) are all
//! `SmolStr` newtypes; minted ones draw their random suffix here.

use smol_str::SmolStr;

/// Random suffix length for minted IDs. A 4-char prefix plus 19 random
/// chars totals 23 bytes, the longest string `SmolStr` stores inline.
const MINT_SUFFIX_LEN: usize = 19;

/// Mint `{prefix}{random-suffix}`.
pub(crate) fn mint(prefix: &str) -> SmolStr {
    SmolStr::new(format!("{prefix}{}", nanoid::nanoid!(MINT_SUFFIX_LEN)))
}

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
