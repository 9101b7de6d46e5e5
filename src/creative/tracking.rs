// src/creative/tracking.rs

use std::collections::BTreeMap;

use url::form_urlencoded;
use url::Url;

const OPER_ID_KEY: &str = "operId";
const BID_ID_KEY: &str = "bidid";
/// 需要改写 bidid 的 tracker 类型
const VIDEO_EVENT_OPER_ID: &str = "8";

/// 把视频事件 tracker（operId=8）中的 bidid 替换为广告位生成的 bid id。
///
/// 重新编码后 operId 保持为第一个参数，其余参数按 key 排序。
/// 不满足条件时返回 None，调用方保留原始 URL。
pub fn rewrite_bid_id(tracking_url: &str, bid_id: &str) -> Option<String> {
    let mut url = Url::parse(tracking_url.trim()).ok()?;

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        params.entry(key.into_owned()).or_default().push(value.into_owned());
    }

    let is_video_event = params
        .get(OPER_ID_KEY)
        .and_then(|values| values.first())
        .map_or(false, |v| v == VIDEO_EVENT_OPER_ID);
    if !is_video_event || !params.contains_key(BID_ID_KEY) {
        return None;
    }

    params.insert(BID_ID_KEY.to_string(), vec![bid_id.to_string()]);
    let oper_ids = params.remove(OPER_ID_KEY).unwrap_or_default();

    let mut query = form_urlencoded::Serializer::new(String::new());
    for value in &oper_ids {
        query.append_pair(OPER_ID_KEY, value);
    }
    for (key, values) in &params {
        for value in values {
            query.append_pair(key, value);
        }
    }
    url.set_query(Some(&query.finish()));
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_bid_id_and_keeps_oper_id_first() {
        let rewritten = rewrite_bid_id("http://t.example.com/track?pubId=5&bidid=orig&operId=8&adv=x", "pod-1").unwrap();
        assert_eq!(rewritten, "http://t.example.com/track?operId=8&adv=x&bidid=pod-1&pubId=5");
    }

    #[test]
    fn other_trackers_are_left_alone() {
        assert!(rewrite_bid_id("http://t.example.com/track?bidid=orig&operId=1", "pod-1").is_none());
        assert!(rewrite_bid_id("http://t.example.com/track?operId=8", "pod-1").is_none());
        assert!(rewrite_bid_id("not a url", "pod-1").is_none());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let rewritten = rewrite_bid_id("\n  http://t.example.com/e?operId=8&bidid=a  \n", "b").unwrap();
        assert_eq!(rewritten, "http://t.example.com/e?operId=8&bidid=b");
    }
}
