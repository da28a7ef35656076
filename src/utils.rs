pub(crate) fn hex(bytes: &[u8]) -> String {
	use std::fmt::Write;
	let mut acc = String::with_capacity(bytes.len() * 2);

	for byte in bytes {
		write!(&mut acc, "{:02x}", byte).unwrap();
	}

	acc
}

/// Makes `text` safe to place inside a quoted Mermaid node label.
pub(crate) fn mermaid_label(text: &str) -> String {
	let mut acc = String::with_capacity(text.len());

	for c in text.chars() {
		match c {
			'"' => acc.push_str("#quot;"),
			'[' => acc.push_str("#91;"),
			']' => acc.push_str("#93;"),
			'\n' | '\r' => acc.push(' '),
			c => acc.push(c),
		}
	}

	acc
}

/// Installs a global `tracing` subscriber printing to stderr.
///
/// The filter is read from `RUST_LOG` and falls back to `info`. Calling this
/// more than once returns an error from the second call on.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
	use tracing_subscriber::layer::SubscriberExt;
	use tracing_subscriber::util::SubscriberInitExt;
	use tracing_subscriber::{EnvFilter, fmt};

	let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.try_init()?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hex() {
		assert_eq!(hex(&[0x00, 0x0f, 0xab]), "000fab");
	}

	#[test]
	fn test_mermaid_label() {
		assert_eq!(mermaid_label("plain :a"), "plain :a");
		assert_eq!(mermaid_label("say \"hi\"\n[x]"), "say #quot;hi#quot; #91;x#93;");
	}
}
