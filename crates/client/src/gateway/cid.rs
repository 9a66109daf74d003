//! Content identifier (CID) extraction.

use regex::Regex;
use std::sync::LazyLock;

/// CIDv0 (`Qm…`), base32 CIDv1 (`b…`/`B…`), base58btc (`z…`) and base16 (`F…`).
static CID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Qm[1-9A-HJ-NP-Za-km-z]{44,}|bafyb[a-zA-Z0-9]{50,}|bafkr[a-zA-Z0-9]{50,}|b[A-Za-z2-7]{58,}|B[A-Z2-7]{58,}|z[1-9A-HJ-NP-Za-km-z]{48,}|F[0-9A-F]{50,}",
    )
    .expect("CID pattern is valid")
});

/// First CID embedded anywhere in `input`.
pub fn extract_cid(input: &str) -> Option<&str> {
    CID_PATTERN.find(input).map(|m| m.as_str())
}

/// URL of `cid` on a gateway. Templates containing `{CID}` are subdomain
/// gateways; any other entry is a prefix the CID is appended to.
pub fn gateway_url(template: &str, cid: &str) -> String {
    if template.contains("{CID}") { template.replace("{CID}", cid) } else { format!("{template}{cid}") }
}
