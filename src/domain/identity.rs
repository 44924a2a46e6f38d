// src/domain/identity.rs

use sha2::{Digest, Sha256};
use url::Url;

/// Canonical form of an offer URL: no query, no fragment, no trailing slash.
/// The same offer reached from different result pages carries different tracking
/// parameters, so they must not take part in the identity.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            let path = url.path().trim_end_matches('/').to_string();
            url.set_path(&path);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// Stable integer id for a listing, used as the `flats` primary key.
///
/// First eight bytes of SHA-256 over the normalized URL, big-endian, with the
/// sign bit cleared so it fits SQLite's INTEGER PRIMARY KEY as a positive value.
pub fn listing_id(url: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) & (i64::MAX as u64)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_params_do_not_change_identity() {
        let a = listing_id("https://www.otodom.pl/pl/oferta/mieszkanie-ID4abc");
        let b = listing_id("https://www.otodom.pl/pl/oferta/mieszkanie-ID4abc?source=search#gallery");
        let c = listing_id("https://WWW.OTODOM.PL/pl/oferta/mieszkanie-ID4abc/");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn different_offers_get_different_ids() {
        let a = listing_id("https://www.otodom.pl/pl/oferta/mieszkanie-ID4abc");
        let b = listing_id("https://www.otodom.pl/pl/oferta/mieszkanie-ID4abd");
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_positive() {
        for i in 0..200 {
            assert!(listing_id(&format!("https://www.otodom.pl/pl/oferta/{i}")) >= 0);
        }
    }

    #[test]
    fn unparsable_urls_are_hashed_as_is() {
        assert_eq!(normalize_url("  not a url "), "not a url");
        assert_eq!(listing_id("not a url"), listing_id(" not a url"));
    }
}
