use rust_embed::RustEmbed;

/// Front-end bundle compiled into the binary; `dist/` holds the built app
#[derive(RustEmbed)]
#[folder = "web/"]
pub struct WebAssets;
