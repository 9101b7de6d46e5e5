// src/creative/vast.rs

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{error, warn};

use crate::creative::tracking::rewrite_bid_id;
use crate::error::CreativeError;
use crate::model::bid::Bid;

pub const VAST_DEFAULT_VERSION: f64 = 2.0;
pub const VAST_VERSIONS: [&str; 5] = ["0", "1.0", "2.0", "3.0", "4.0"];
pub const EMPTY_VAST: &str = r#"<VAST version="2.0"/>"#;

const VAST_ELEMENT: &[u8] = b"VAST";
const AD_ELEMENT: &[u8] = b"Ad";
const TRACKING_ELEMENT: &[u8] = b"Tracking";
const HTTP_PREFIX: &str = "http";

/// 从单个 VAST 文档中取出的第一个 `<Ad>`，没有 `<Ad>` 时 events 为空
struct ExtractedAd {
    version: f64,
    events: Vec<Event<'static>>,
}

/// **VAST 素材合并器**
///
/// 按胜出顺序把各出价的第一个 `<Ad>` 拼到一个 VAST 文档里，
/// 依次写入 sequence 属性，并在根节点上写入出现过的最高版本。
pub struct CreativeAssembler;

impl CreativeAssembler {
    /// 合并失败时返回 None；单个出价解析失败只会跳过该出价
    pub fn assemble(bids: &[Bid]) -> Option<String> {
        match Self::try_assemble(bids) {
            Ok(vast) => Some(vast),
            Err(e) => {
                error!(error = %e, bids = bids.len(), "error while creating adpod vast");
                None
            }
        }
    }

    pub fn try_assemble(bids: &[Bid]) -> Result<String, CreativeError> {
        let mut version = VAST_DEFAULT_VERSION;
        let mut ads: Vec<Vec<Event<'static>>> = Vec::with_capacity(bids.len());

        for bid in bids {
            if bid.adm.starts_with(HTTP_PREFIX) {
                ads.push(wrapper_ad(&bid.adm));
                continue;
            }
            let rewrite_to = bid.needs_bid_id_rewrite().then_some(bid.id.as_str());
            match extract_first_ad(&bid.adm, rewrite_to) {
                Ok(ad) => {
                    version = version.max(ad.version);
                    if !ad.events.is_empty() {
                        ads.push(ad.events);
                    }
                }
                Err(e) => {
                    warn!(bid_id = %bid.id, error = %e, "skipping bid with invalid VAST creative");
                }
            }
        }

        write_vast(version_label(version), &ads)
    }
}

/// 把版本号限制在支持的枚举范围内
pub fn version_label(version: f64) -> &'static str {
    let index = if version.is_finite() && version > 0.0 { version as usize } else { 0 };
    VAST_VERSIONS[index.min(VAST_VERSIONS.len() - 1)]
}

fn wrapper_ad(tag_uri: &str) -> Vec<Event<'static>> {
    vec![
        Event::Start(BytesStart::new("Ad")),
        Event::Start(BytesStart::new("Wrapper")),
        Event::Start(BytesStart::new("VASTAdTagURI")),
        Event::Text(BytesText::new(tag_uri).into_owned()),
        Event::End(BytesEnd::new("VASTAdTagURI")),
        Event::End(BytesEnd::new("Wrapper")),
        Event::End(BytesEnd::new("Ad")),
    ]
}

fn extract_first_ad(adm: &str, rewrite_to: Option<&str>) -> Result<ExtractedAd, CreativeError> {
    let mut reader = Reader::from_str(adm);
    let mut depth = 0usize;
    let mut version: Option<f64> = None;
    let mut ad: Vec<Event<'static>> = Vec::new();
    let mut collecting = false;
    let mut in_tracking = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                depth += 1;
                if depth == 1 {
                    version = Some(root_version(e)?);
                } else if depth == 2 && ad.is_empty() && e.local_name().as_ref() == AD_ELEMENT {
                    collecting = true;
                }
                if collecting {
                    in_tracking = e.local_name().as_ref() == TRACKING_ELEMENT;
                    ad.push(event.into_owned());
                }
            }
            Event::End(_) => {
                if collecting {
                    in_tracking = false;
                    let closes_ad = depth == 2;
                    ad.push(event.into_owned());
                    if closes_ad {
                        collecting = false;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(ref e) => {
                if depth == 0 {
                    version = Some(root_version(e)?);
                } else if depth == 1 && ad.is_empty() && e.local_name().as_ref() == AD_ELEMENT {
                    ad.push(event.into_owned());
                } else if collecting {
                    ad.push(event.into_owned());
                }
            }
            Event::Text(ref t) if collecting && in_tracking && rewrite_to.is_some() => {
                let rewritten = {
                    let text = t.unescape()?;
                    rewrite_to.and_then(|id| rewrite_bid_id(&text, id))
                };
                match rewritten {
                    Some(url) => ad.push(Event::Text(BytesText::new(&url).into_owned())),
                    None => ad.push(event.into_owned()),
                }
            }
            Event::CData(ref c) if collecting && in_tracking && rewrite_to.is_some() => {
                let rewritten = std::str::from_utf8(c)
                    .ok()
                    .and_then(|text| rewrite_to.and_then(|id| rewrite_bid_id(text, id)));
                match rewritten {
                    Some(url) => ad.push(Event::CData(BytesCData::new(url))),
                    None => ad.push(event.into_owned()),
                }
            }
            _ if collecting => ad.push(event.into_owned()),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CreativeError::Unclosed(depth));
    }
    let version = version.ok_or(CreativeError::MissingVastRoot)?;
    Ok(ExtractedAd { version, events: ad })
}

fn root_version(root: &BytesStart) -> Result<f64, CreativeError> {
    if root.local_name().as_ref() != VAST_ELEMENT {
        return Err(CreativeError::MissingVastRoot);
    }
    let version = match root.try_get_attribute("version").map_err(quick_xml::Error::from)? {
        Some(attr) => attr.unescape_value()?.trim().parse::<f64>().unwrap_or(0.0),
        None => VAST_DEFAULT_VERSION,
    };
    Ok(version)
}

/// 替换（或追加）`<Ad>` 上的 sequence 属性，其余属性原样保留
fn with_sequence(ad: &BytesStart, sequence: usize) -> Result<BytesStart<'static>, CreativeError> {
    let sequence = sequence.to_string();
    let mut sequenced = BytesStart::new(String::from_utf8_lossy(ad.name().as_ref()).into_owned());
    let mut replaced = false;
    for attr in ad.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"sequence" {
            sequenced.push_attribute(("sequence", sequence.as_str()));
            replaced = true;
        } else {
            sequenced.push_attribute(attr);
        }
    }
    if !replaced {
        sequenced.push_attribute(("sequence", sequence.as_str()));
    }
    Ok(sequenced)
}

fn write_vast(version: &str, ads: &[Vec<Event<'static>>]) -> Result<String, CreativeError> {
    let mut writer = Writer::new(Vec::new());
    let root = BytesStart::new("VAST").with_attributes([("version", version)]);

    if ads.is_empty() {
        writer.write_event(Event::Empty(root))?;
    } else {
        writer.write_event(Event::Start(root))?;
        for (i, events) in ads.iter().enumerate() {
            for (j, event) in events.iter().enumerate() {
                match event {
                    Event::Start(ad) if j == 0 => writer.write_event(Event::Start(with_sequence(ad, i + 1)?))?,
                    Event::Empty(ad) if j == 0 => writer.write_event(Event::Empty(with_sequence(ad, i + 1)?))?,
                    other => writer.write_event(other)?,
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new("VAST")))?;
    }

    Ok(String::from_utf8(writer.into_inner())?)
}
