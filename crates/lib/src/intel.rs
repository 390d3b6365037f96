//! Intelligence extraction: pattern scans over the latest scammer message.
//!
//! Four independent scans (bank accounts, UPI ids, links, phone numbers). Pure and
//! deterministic. Matches keep first-seen order and duplicates are collapsed.
//! A 10-digit number starting with 6-9 is a phone number, never also a bank account.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// 9 to 18 digit runs (common bank account lengths).
    static ref BANK_ACCOUNT: Regex = Regex::new(r"\b\d{9,18}\b").unwrap();
    /// `handle@bank` payment ids (e.g. rahul@okicici).
    static ref UPI_ID: Regex = Regex::new(r"[a-zA-Z0-9.\-_]{2,256}@[a-zA-Z]{2,64}").unwrap();
    /// http(s) links up to the next whitespace.
    static ref LINK: Regex = Regex::new(r"https?://\S+").unwrap();
    /// Indian mobile numbers: 10 digits starting with 6-9.
    static ref PHONE: Regex = Regex::new(r"\b[6-9]\d{9}\b").unwrap();
}

/// Identifiers extracted from one message. Serialized with the collector's field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intelligence {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
}

impl Intelligence {
    /// True when no scan found anything.
    pub fn is_empty(&self) -> bool {
        self.bank_accounts.is_empty()
            && self.upi_ids.is_empty()
            && self.phishing_links.is_empty()
            && self.phone_numbers.is_empty()
    }

    /// Total number of identifiers across all four collections.
    pub fn len(&self) -> usize {
        self.bank_accounts.len() + self.upi_ids.len() + self.phishing_links.len() + self.phone_numbers.len()
    }
}

fn collect(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let s = m.as_str();
        if !out.iter().any(|seen| seen == s) {
            out.push(s.to_string());
        }
    }
    out
}

/// Scan `text` for bank accounts, UPI ids, links and phone numbers.
pub fn extract(text: &str) -> Intelligence {
    let phone_numbers = collect(&PHONE, text);
    let bank_accounts = collect(&BANK_ACCOUNT, text)
        .into_iter()
        .filter(|n| !phone_numbers.contains(n))
        .collect();
    Intelligence {
        bank_accounts,
        upi_ids: collect(&UPI_ID, text),
        phishing_links: collect(&LINK, text),
        phone_numbers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number_only_in_phone_set() {
        let intel = extract("call me on 7012345678 now");
        assert_eq!(intel.phone_numbers, vec!["7012345678"]);
        assert!(intel.bank_accounts.is_empty());
        assert!(intel.upi_ids.is_empty());
        assert!(intel.phishing_links.is_empty());
    }

    #[test]
    fn upi_id_exact_token() {
        let intel = extract("pay to rahul@okicici");
        assert_eq!(intel.upi_ids, vec!["rahul@okicici"]);
        assert_eq!(intel.len(), 1);
    }

    #[test]
    fn bank_account_lengths() {
        let intel = extract("acc 123456789 and 123456789012345678 but not 12345678 or 1234567890123456789");
        assert_eq!(intel.bank_accounts, vec!["123456789", "123456789012345678"]);
        assert!(intel.phone_numbers.is_empty());
    }

    #[test]
    fn ten_digits_not_starting_six_to_nine_is_account() {
        let intel = extract("transfer to 5012345678");
        assert_eq!(intel.bank_accounts, vec!["5012345678"]);
        assert!(intel.phone_numbers.is_empty());
    }

    #[test]
    fn phone_inside_longer_number_is_ignored() {
        let intel = extract("account 129876543210");
        assert!(intel.phone_numbers.is_empty());
        assert_eq!(intel.bank_accounts, vec!["129876543210"]);
    }

    #[test]
    fn links_stop_at_whitespace() {
        let intel = extract("verify at https://sbi-kyc.example/login?id=9 or http://bit.ly/x now");
        assert_eq!(
            intel.phishing_links,
            vec!["https://sbi-kyc.example/login?id=9", "http://bit.ly/x"]
        );
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let intel = extract("ab@paytm then cd@ybl then ab@paytm");
        assert_eq!(intel.upi_ids, vec!["ab@paytm", "cd@ybl"]);
    }

    #[test]
    fn plain_text_is_empty() {
        let intel = extract("Hello, I am from the bank. Give me your UPI PIN immediately.");
        assert!(intel.is_empty());
        assert_eq!(intel.len(), 0);
    }

    #[test]
    fn serializes_collector_field_names() {
        let intel = extract("pay rahul@okicici");
        let v = serde_json::to_value(&intel).unwrap();
        assert_eq!(v["upiIds"][0], "rahul@okicici");
        assert!(v["bankAccounts"].as_array().unwrap().is_empty());
        assert!(v.get("phishingLinks").is_some());
        assert!(v.get("phoneNumbers").is_some());
    }
}
