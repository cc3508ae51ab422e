// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agency record number watermark.
//!
//! Referral documents carry the agency's 5-digit record number repeated as a
//! watermark across pages. The most frequent 5-digit token is taken as the
//! record number (smallest on ties) and every occurrence is stripped from the
//! text handed to the language model.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static FIVE_DIGIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5}\b").unwrap());

/// The record number and the text with the watermark removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub record_number: String,
    pub cleaned_text: String,
}

/// Find the watermark in `text`. Returns `None` when no 5-digit token occurs.
pub fn extract_and_strip(text: &str) -> Option<Watermark> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for token in FIVE_DIGIT_TOKEN.find_iter(text) {
        *frequency.entry(token.as_str()).or_default() += 1;
    }

    let record_number = frequency
        .iter()
        .max_by(|(a_token, a_count), (b_token, b_count)| {
            a_count.cmp(b_count).then_with(|| b_token.cmp(a_token))
        })
        .map(|(token, _)| token.to_string())?;

    let stripped = FIVE_DIGIT_TOKEN.replace_all(text, |caps: &Captures<'_>| {
        if &caps[0] == record_number {
            " ".to_string()
        } else {
            caps[0].to_string()
        }
    });
    let cleaned_text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    Some(Watermark {
        record_number,
        cleaned_text,
    })
}
