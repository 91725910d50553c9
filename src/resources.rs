//! Asset loading.
//!
//! Natively assets are read from `./assets`; on the web they are fetched from
//! `<origin>/assets`.

use crate::{svg::Svg, text::Font};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("No browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("Could not read the page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        use anyhow::Context as _;
        let path = asset_path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        use anyhow::Context as _;
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_svg(file_name: &str) -> anyhow::Result<Svg> {
    load_string(file_name).await?.parse()
}

pub async fn load_font(file_name: &str) -> anyhow::Result<Font> {
    Font::from_bytes(load_binary(file_name).await?)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_assets_are_errors() {
        let err = load_binary("does-not-exist.bin").await.unwrap_err();
        assert!(err.to_string().contains("does-not-exist.bin"));
    }

    #[tokio::test]
    async fn loads_the_bundled_font() {
        // tests run from the crate root
        let font = load_font("font.ttf").await.unwrap();
        assert!(font.glyphs() > 0);
    }
}
