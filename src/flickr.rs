use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::{form_urlencoded, Url};

use crate::config::Settings;
use crate::error::FetchError;
use crate::models::{PhotoRecord, SearchQuery};

/// Builds the photo-search URL for `query`.
/// Each space in the query becomes a literal comma; everything else in a tag
/// is percent-encoded.
pub fn search_url(settings: &Settings, query: &SearchQuery) -> Result<Url, FetchError> {
    let tags = query
        .tags()
        .map(encode)
        .collect::<Vec<_>>()
        .join(",");

    let separator = if settings.endpoint.contains('?') { '&' } else { '?' };
    let raw = format!(
        "{}{}method=flickr.photos.search&api_key={}&tags={}&tag_mode=all&per_page={}&privacy_filter=1",
        settings.endpoint,
        separator,
        encode(&settings.api_key),
        tags,
        settings.per_page
    );

    Ok(Url::parse(&raw)?)
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Collects every `<photo>` element of a search response, at any depth, in
/// document order. A document with no photos is not an error.
pub fn parse_photos(body: &[u8]) -> Result<Vec<PhotoRecord>, FetchError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut photos = Vec::new();
    let mut saw_root = false;
    let mut failed = false;
    let mut api_error: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if !saw_root {
                    saw_root = true;
                    failed = attribute(&e, b"stat")?.as_deref() == Some("fail");
                }
                match e.name().as_ref() {
                    b"photo" => photos.push(photo_from(&e)?),
                    b"err" => {
                        let code = attribute(&e, b"code")?.unwrap_or_default();
                        let message = attribute(&e, b"msg")?.unwrap_or_default();
                        api_error = Some((code, message));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::parse(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(FetchError::parse("response contained no XML element"));
    }

    if failed || api_error.is_some() {
        let (code, message) = api_error.unwrap_or_else(|| (String::new(), "request failed".to_string()));
        return Err(FetchError::Api { code, message });
    }

    Ok(photos)
}

fn photo_from(e: &BytesStart) -> Result<PhotoRecord, FetchError> {
    let required = |name: &str| -> Result<String, FetchError> {
        attribute(e, name.as_bytes())?
            .ok_or_else(|| FetchError::parse(format!("<photo> is missing the `{}` attribute", name)))
    };

    Ok(PhotoRecord {
        id: required("id")?,
        title: attribute(e, b"title")?.unwrap_or_default(),
        secret: required("secret")?,
        server: required("server")?,
        farm: required("farm")?,
    })
}

fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>, FetchError> {
    for attr in e.attributes() {
        let attr = attr.map_err(FetchError::parse)?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(FetchError::parse)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
