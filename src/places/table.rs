//! Static Gyeonggi-do place table
//!
//! Keys are normalized names: no province prefix and no trailing 시/군.
//! Sub-districts (구, new towns) carry their own coordinates but query the
//! providers with the district they belong to.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaceEntry {
    pub key: &'static str,
    pub display: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    /// Search term matched against SGIS `addr_name`
    pub district_query: &'static str,
    /// `sgg_nm` values used by the vegetation WFS filter
    pub sgg_names: &'static [&'static str],
    /// Extra spellings that resolve to this entry
    pub aliases: &'static [&'static str],
}

macro_rules! place {
    ($key:literal, $display:literal, $lat:literal, $lon:literal, $zoom:literal, $query:literal, [$($sgg:literal),*] $(, [$($alias:literal),*])?) => {
        PlaceEntry {
            key: $key,
            display: $display,
            lat: $lat,
            lon: $lon,
            zoom: $zoom,
            district_query: $query,
            sgg_names: &[$($sgg),*],
            aliases: &[$($($alias),*)?],
        }
    };
}

pub(crate) static PLACES: &[PlaceEntry] = &[
    // Cities with sub-districts
    place!("수원", "수원시", 37.2636, 127.0286, 13, "수원시",
        ["수원시", "수원시장안구", "수원시권선구", "수원시팔달구", "수원시영통구"]),
    place!("성남", "성남시", 37.4201, 127.1265, 13, "성남시",
        ["성남시", "성남시수정구", "성남시중원구", "성남시분당구"]),
    place!("용인", "용인시", 37.2411, 127.1776, 12, "용인시",
        ["용인시", "용인시처인구", "용인시기흥구", "용인시수지구"]),
    place!("안양", "안양시", 37.3943, 126.9568, 13, "안양시",
        ["안양시", "안양시만안구", "안양시동안구"]),
    place!("안산", "안산시", 37.3219, 126.8309, 13, "안산시",
        ["안산시", "안산시상록구", "안산시단원구"]),
    place!("고양", "고양시", 37.6583, 126.8320, 12, "고양시",
        ["고양시", "고양시덕양구", "고양시일산동구", "고양시일산서구"]),
    // Other cities
    place!("부천", "부천시", 37.5034, 126.7660, 13, "부천시", ["부천시"]),
    place!("광명", "광명시", 37.4786, 126.8644, 14, "광명시", ["광명시"]),
    place!("평택", "평택시", 36.9921, 127.0857, 12, "평택시", ["평택시"]),
    place!("과천", "과천시", 37.4292, 126.9876, 14, "과천시", ["과천시"]),
    place!("구리", "구리시", 37.5943, 127.1295, 13, "구리시", ["구리시"]),
    place!("남양주", "남양주시", 37.6360, 127.2165, 12, "남양주시", ["남양주시"]),
    place!("오산", "오산시", 37.1498, 127.0772, 13, "오산시", ["오산시"]),
    place!("시흥", "시흥시", 37.3800, 126.8028, 12, "시흥시", ["시흥시"]),
    place!("군포", "군포시", 37.3616, 126.9352, 13, "군포시", ["군포시"]),
    place!("의왕", "의왕시", 37.3447, 126.9685, 14, "의왕시", ["의왕시"]),
    place!("하남", "하남시", 37.5392, 127.2147, 13, "하남시", ["하남시"]),
    place!("파주", "파주시", 37.7126, 126.7610, 12, "파주시", ["파주시"]),
    place!("이천", "이천시", 37.2719, 127.4348, 12, "이천시", ["이천시"]),
    place!("안성", "안성시", 37.0078, 127.2797, 12, "안성시", ["안성시"]),
    place!("김포", "김포시", 37.6153, 126.7156, 12, "김포시", ["김포시"]),
    place!("화성", "화성시", 37.1995, 126.8313, 12, "화성시", ["화성시"]),
    place!("광주", "광주시", 37.4095, 127.2550, 12, "광주시", ["광주시"]),
    place!("양주", "양주시", 37.7854, 127.0456, 12, "양주시", ["양주시"]),
    place!("포천", "포천시", 37.8949, 127.2003, 12, "포천시", ["포천시"]),
    place!("여주", "여주시", 37.2984, 127.6374, 12, "여주시", ["여주시"]),
    place!("의정부", "의정부시", 37.7381, 127.0337, 13, "의정부시", ["의정부시"]),
    place!("동두천", "동두천시", 37.9036, 127.0606, 13, "동두천시", ["동두천시"]),
    // Counties
    place!("연천", "연천군", 38.0965, 127.0748, 12, "연천군", ["연천군"]),
    place!("가평", "가평군", 37.8315, 127.5097, 12, "가평군", ["가평군"]),
    place!("양평", "양평군", 37.4917, 127.4876, 12, "양평군", ["양평군"]),
    // Sub-districts and new towns
    place!("분당", "분당구", 37.3838, 127.1192, 13, "분당구", ["성남시분당구"], ["분당구"]),
    place!("판교", "판교", 37.3947, 127.1112, 14, "분당구", ["성남시분당구"], ["판교동"]),
    place!("수정", "수정구", 37.4530, 127.1455, 13, "수정구", ["성남시수정구"], ["수정구"]),
    place!("중원", "중원구", 37.4344, 127.1365, 13, "중원구", ["성남시중원구"], ["중원구"]),
    place!("영통", "영통구", 37.2479, 127.0735, 13, "영통구", ["수원시영통구"], ["영통구"]),
    place!("권선", "권선구", 37.2504, 127.0030, 13, "권선구", ["수원시권선구"], ["권선구"]),
    place!("장안", "장안구", 37.3035, 127.0106, 13, "장안구", ["수원시장안구"], ["장안구"]),
    place!("팔달", "팔달구", 37.2795, 127.0392, 13, "팔달구", ["수원시팔달구"], ["팔달구"]),
    place!("일산", "일산", 37.6755, 126.7706, 13, "일산동구",
        ["고양시일산동구", "고양시일산서구"], ["일산동구", "일산서구"]),
    place!("동탄", "동탄", 37.2007, 127.0714, 13, "화성시", ["화성시"], ["동탄신도시"]),
];

/// Name (normalized key or alias) → table entry
pub(crate) static INDEX: Lazy<HashMap<&'static str, &'static PlaceEntry>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for entry in PLACES {
        map.insert(entry.key, entry);
        for alias in entry.aliases {
            map.insert(*alias, entry);
        }
    }
    map
});
