//! Text form of a stamp: `itc:v1:` followed by the hex of its wire bytes.

use crate::clock::stamp::Stamp;
use crate::config::CodecConfig;
use crate::error::DecodeError;

pub const ITC_TEXT_PREFIX: &str = "itc:v1:";

/// `itc:v1:` followed by the lowercase hex of [`Stamp::marshal`].
#[must_use]
pub fn stamp_to_text(stamp: &Stamp) -> String {
    format!("{ITC_TEXT_PREFIX}{}", hex::encode(stamp.marshal()))
}

/// Parse the text form with the default [`CodecConfig`].
///
/// # Errors
///
/// [`DecodeError::InvalidText`] for a missing prefix or bad hex, otherwise
/// whatever [`Stamp::unmarshal`] reports for the decoded bytes.
pub fn stamp_from_text(raw: &str) -> Result<Stamp, DecodeError> {
    stamp_from_text_with(raw, &CodecConfig::default())
}

/// Parse the text form, enforcing the limits in `config`.
///
/// # Errors
///
/// See [`stamp_from_text`].
pub fn stamp_from_text_with(raw: &str, config: &CodecConfig) -> Result<Stamp, DecodeError> {
    let encoded = raw.trim().strip_prefix(ITC_TEXT_PREFIX).ok_or_else(|| {
        DecodeError::InvalidText(format!("missing `{ITC_TEXT_PREFIX}` prefix"))
    })?;
    let bytes = hex::decode(encoded).map_err(|err| DecodeError::InvalidText(err.to_string()))?;
    Stamp::unmarshal_with(&bytes, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_text() {
        assert_eq!(stamp_to_text(&Stamp::seed()), "itc:v1:30");
    }

    #[test]
    fn stamp_text_roundtrip() {
        let mut stamp = Stamp::seed();
        let mut other = stamp.fork().expect("fork seed");
        stamp.event().expect("event");
        other.event().expect("event");
        other.event().expect("event");

        for s in [stamp, other] {
            let encoded = stamp_to_text(&s);
            let decoded = stamp_from_text(&encoded).expect("parse encoded stamp");
            assert_eq!(decoded, s);
        }
    }

    #[test]
    fn uppercase_hex_and_whitespace_accepted() {
        assert_eq!(stamp_from_text(" itc:v1:30\n"), Ok(Stamp::seed()));
        let mut stamp = Stamp::seed();
        stamp.event().expect("event");
        let upper = stamp_to_text(&stamp).to_uppercase().replace("ITC:V1:", ITC_TEXT_PREFIX);
        assert_eq!(stamp_from_text(&upper), Ok(stamp));
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(matches!(
            stamp_from_text("itc:v1:not-hex"),
            Err(DecodeError::InvalidText(_))
        ));
        assert!(matches!(
            stamp_from_text("itc:v1:abc"),
            Err(DecodeError::InvalidText(_))
        ));
        assert!(matches!(
            stamp_from_text("itc:30"),
            Err(DecodeError::InvalidText(_))
        ));
    }

    #[test]
    fn decode_passes_through_wire_errors() {
        assert!(matches!(
            stamp_from_text("itc:v1:"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert_eq!(stamp_from_text("itc:v1:31"), Err(DecodeError::TrailingData(1)));
    }

    #[test]
    fn limits_apply_to_text() {
        let config = CodecConfig {
            max_input_bytes: 0,
            ..CodecConfig::default()
        };
        assert_eq!(
            stamp_from_text_with("itc:v1:30", &config),
            Err(DecodeError::InputTooLarge { actual: 1, max: 0 })
        );
    }
}
