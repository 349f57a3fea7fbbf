use std::pin::Pin;

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use futures::{Stream, StreamExt};

use crate::error::{SlamError, SlamErrorKind};

pub type DynStream = dyn Stream<Item = Result<Bytes, SlamError>> + Send;
pub type BodyStream = Pin<Box<DynStream>>;

pub fn once(bytes: impl Into<Bytes>) -> BodyStream {
	Box::pin(futures::stream::once(std::future::ready(Ok(bytes.into()))))
}

/// Pull every chunk off the body and copy them into one buffer.
pub async fn gather(mut body: BodyStream) -> Result<Vec<u8>, SlamError> {
	let mut chunks: Vec<Bytes> = Vec::new();
	while let Some(chunk) = body.next().await.transpose()? {
		chunks.push(chunk);
	}

	let length = chunks.iter().map(|chunk| chunk.len()).sum();
	let mut bytes = Vec::with_capacity(length);
	for chunk in chunks {
		bytes.extend_from_slice(&chunk);
	}
	Ok(bytes)
}

/// Extract the `charset` parameter from a Content-Type value.
fn charset_param(content_type: &str) -> Option<&str> {
	content_type.split(';').skip(1).find_map(|param| {
		let (name, value) = param.split_once('=')?;
		name.trim()
			.eq_ignore_ascii_case("charset")
			.then(|| value.trim().trim_matches('"'))
	})
}

pub(crate) fn encoding_for(content_type: Option<&str>) -> &'static Encoding {
	content_type
		.and_then(charset_param)
		.and_then(|label| Encoding::for_label(label.as_bytes()))
		.unwrap_or(UTF_8)
}

/// Decode a body as text.
///
/// Uses the declared charset when encoding_rs knows it, UTF-8 otherwise. A
/// leading BOM overrides both. Malformed sequences are an error, not
/// replacement characters.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> Result<String, SlamError> {
	let (encoding, bom_len) =
		Encoding::for_bom(bytes).unwrap_or((encoding_for(content_type), 0));

	encoding
		.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
		.map(|text| text.into_owned())
		.ok_or_else(|| {
			SlamError::new(
				SlamErrorKind::DecodeFailure,
				Some(format!("body is not valid {}", encoding.name())),
			)
		})
}
