//! BR-Code payload encoder (TLV + CRC16).
//!
//! A receive-payment code is a flat sequence of Tag-Length-Value
//! records: a 2-digit numeric tag, a 2-digit decimal length counting
//! the value's characters, and the raw value. Values may themselves be
//! TLV sequences (merchant account info, additional data). The payload
//! is terminated by tag 63, whose 4-uppercase-hex value is a
//! CRC-16/CCITT-FALSE computed over everything before it *including*
//! the literal `6304` tag+length prefix.

use gateway_types::{DomainError, Money};

const PAYLOAD_FORMAT_INDICATOR: &str = "01";
const MERCHANT_ACCOUNT_GUI: &str = "br.gov.bcb.pix";
const MERCHANT_CATEGORY_CODE: &str = "0000";
const COUNTRY_CODE: &str = "BR";
/// Tag + length prefix of the trailing CRC record.
const CRC_PREFIX: &str = "6304";

/// The length field is two decimal digits, so no value may exceed this.
const MAX_TLV_VALUE: usize = 99;

const MAX_DESCRIPTION: usize = 25;
const MAX_MERCHANT_NAME: usize = 25;
const MAX_MERCHANT_CITY: usize = 15;

/// Parameters for one receive-payment code.
#[derive(Debug, Clone)]
pub struct BrCode {
    /// The receiving key the payment is addressed to.
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    /// Static codes omit the amount; the payer types one in.
    pub amount: Option<Money>,
    pub description: Option<String>,
    /// Charge transaction id; `***` when absent, per the static-code
    /// convention.
    pub txid: Option<String>,
}

impl BrCode {
    /// Renders the full ASCII payload, CRC included.
    ///
    /// Fails when a value cannot fit its two-digit length field (an
    /// overlong receiving key, mostly); a silently miscounted record
    /// would still carry a valid CRC and scan as garbage.
    pub fn encode(&self) -> Result<String, DomainError> {
        let mut out = String::new();
        tlv("00", PAYLOAD_FORMAT_INDICATOR, &mut out)?;

        let mut account = String::new();
        tlv("00", MERCHANT_ACCOUNT_GUI, &mut account)?;
        tlv("01", &self.key, &mut account)?;
        if let Some(description) = &self.description {
            tlv("02", truncate(description, MAX_DESCRIPTION), &mut account)?;
        }
        tlv("26", &account, &mut out)?;

        tlv("52", MERCHANT_CATEGORY_CODE, &mut out)?;
        if let Some(amount) = &self.amount {
            tlv("53", amount.currency().iso_numeric(), &mut out)?;
            tlv("54", &amount.to_decimal_string(), &mut out)?;
        } else {
            tlv("53", gateway_types::Currency::BRL.iso_numeric(), &mut out)?;
        }
        tlv("58", COUNTRY_CODE, &mut out)?;
        tlv("59", truncate(&self.merchant_name, MAX_MERCHANT_NAME), &mut out)?;
        tlv("60", truncate(&self.merchant_city, MAX_MERCHANT_CITY), &mut out)?;

        let mut additional = String::new();
        tlv("05", self.txid.as_deref().unwrap_or("***"), &mut additional)?;
        tlv("62", &additional, &mut out)?;

        out.push_str(CRC_PREFIX);
        let crc = crc16_ccitt_false(&out);
        out.push_str(&format!("{:04X}", crc));
        Ok(out)
    }
}

/// Checks that a payload's trailing CRC matches its content.
pub fn verify_crc(payload: &str) -> bool {
    if payload.len() < 8 || !payload.is_ascii() {
        return false;
    }
    let (body, crc) = payload.split_at(payload.len() - 4);
    if !body.ends_with(CRC_PREFIX) {
        return false;
    }
    format!("{:04X}", crc16_ccitt_false(body)) == crc
}

fn tlv(tag: &str, value: &str, out: &mut String) -> Result<(), DomainError> {
    let len = value.chars().count();
    if len > MAX_TLV_VALUE {
        return Err(DomainError::Validation(format!(
            "QR field {tag} is {len} chars, the length field caps at {MAX_TLV_VALUE}"
        )));
    }
    out.push_str(tag);
    out.push_str(&format!("{len:02}"));
    out.push_str(value);
    Ok(())
}

/// CRC-16/CCITT-FALSE: init 0xFFFF, polynomial 0x1021, no reflection,
/// no final XOR.
fn crc16_ccitt_false(payload: &str) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for ch in payload.chars() {
        crc ^= (ch as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::Currency;
    use rand::Rng;
    use rand::distr::Alphanumeric;

    fn sample_code() -> BrCode {
        BrCode {
            key: "123e4567-e89b-42d3-a456-426614174000".to_string(),
            merchant_name: "Loja Exemplo".to_string(),
            merchant_city: "SAO PAULO".to_string(),
            amount: Some(Money::new(10000, Currency::BRL).unwrap()),
            description: Some("Test payment".to_string()),
            txid: Some("TX123".to_string()),
        }
    }

    #[test]
    fn test_crc_of_empty_payload() {
        assert_eq!(crc16_ccitt_false(""), 0xFFFF);
    }

    #[test]
    fn test_payload_structure() {
        let payload = sample_code().encode().unwrap();
        assert!(payload.starts_with("000201"));
        assert!(payload.contains("br.gov.bcb.pix"));
        assert!(payload.contains("5303986"));
        assert!(payload.contains("100.00"));
        assert!(payload.contains("5802BR"));
        assert!(payload.is_ascii());
    }

    #[test]
    fn test_trailing_crc_shape() {
        let payload = sample_code().encode().unwrap();
        let tail = &payload[payload.len() - 8..];
        assert!(tail.starts_with("6304"));
        assert!(tail[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let code = sample_code();
        assert_eq!(code.encode().unwrap(), code.encode().unwrap());
    }

    #[test]
    fn test_crc_self_consistency() {
        assert!(verify_crc(&sample_code().encode().unwrap()));
    }

    #[test]
    fn test_corrupted_payload_fails_crc() {
        let payload = sample_code().encode().unwrap();
        let corrupted = payload.replacen("100.00", "100.01", 1);
        assert!(!verify_crc(&corrupted));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(!verify_crc(""));
        assert!(!verify_crc("6304"));
        assert!(!verify_crc("no-crc-here"));
    }

    #[test]
    fn test_crc_over_randomized_inputs() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let name_len = rng.random_range(1..=25);
            let city_len = rng.random_range(1..=15);
            let desc_len = rng.random_range(0..=25);
            let name: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(name_len)
                .map(char::from)
                .collect();
            let city: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(city_len)
                .map(char::from)
                .collect();
            let description: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(desc_len)
                .map(char::from)
                .collect();
            let amount = rng.random_range(1..=10_000_000);

            let code = BrCode {
                key: "pagador@example.com".to_string(),
                merchant_name: name,
                merchant_city: city,
                amount: Some(Money::new(amount, Currency::BRL).unwrap()),
                description: if description.is_empty() {
                    None
                } else {
                    Some(description)
                },
                txid: None,
            };
            assert!(verify_crc(&code.encode().unwrap()));
        }
    }

    #[test]
    fn test_fields_are_truncated() {
        let code = BrCode {
            key: "k".to_string(),
            merchant_name: "A very long merchant name that exceeds the cap".to_string(),
            merchant_city: "A very long city name".to_string(),
            amount: None,
            description: Some("A description that is far too long to fit".to_string()),
            txid: None,
        };
        let payload = code.encode().unwrap();
        assert!(payload.contains("5925A very long merchant name6015"));
        assert!(payload.contains("6015A very long cit"));
        assert!(verify_crc(&payload));
    }

    #[test]
    fn test_oversized_account_group_is_rejected() {
        // A 72-char email key plus a full-length description pushes the
        // merchant account group past what a two-digit length can carry;
        // the old behavior was a three-digit length with a valid CRC.
        let mut code = sample_code();
        code.key = format!("{}@example.com", "a".repeat(60));
        code.description = Some("Pagamento de teste longo.".to_string());
        let err = code.encode();
        assert!(err.is_err());

        code.description = None;
        let payload = code.encode().unwrap();
        assert!(verify_crc(&payload));
        assert!(!payload.contains("26123"));
    }

    #[test]
    fn test_static_code_defaults_txid() {
        let mut code = sample_code();
        code.txid = None;
        let payload = code.encode().unwrap();
        assert!(payload.contains("62070503***"));
    }
}
