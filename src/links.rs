// Search links for a track on Spotify, Apple Music and Genius

use crate::scrobbler::TrackRef;
use crate::text_cleanup::TextCleaner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLinks {
    pub spotify: String,
    pub apple: String,
    pub genius: String,
}

/// Form-style encoding, spaces become '+'
fn encode_plus(text: &str) -> String {
    urlencoding::encode(text).replace("%20", "+")
}

pub fn search_links(track: &TrackRef, cleaner: &TextCleaner) -> SearchLinks {
    let query = format!("{} {}", track.artist, track.title);
    let lyrics_query = cleaner.lyrics_query(track);

    SearchLinks {
        spotify: format!("https://open.spotify.com/search/{}?si=1", encode_plus(&query)),
        apple: format!("https://music.apple.com/search?term={}", urlencoding::encode(&query)),
        genius: format!("https://genius.com/search?q={}", encode_plus(&lyrics_query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanupConfig;

    #[test]
    fn builds_encoded_urls() {
        let cleaner = TextCleaner::new(&CleanupConfig::default());
        let track = TrackRef::new("Sigur Rós", "Hoppípolla - 2019 Remaster", "Takk...");
        let links = search_links(&track, &cleaner);

        assert_eq!(
            links.spotify,
            "https://open.spotify.com/search/Sigur+R%C3%B3s+Hopp%C3%ADpolla+-+2019+Remaster?si=1"
        );
        assert!(links.apple.starts_with("https://music.apple.com/search?term=Sigur%20R%C3%B3s%20"));
        assert_eq!(links.genius, "https://genius.com/search?q=Sigur+R%C3%B3s+Hopp%C3%ADpolla");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let cleaner = TextCleaner::new(&CleanupConfig::default());
        let links = search_links(&TrackRef::new("AC/DC", "T.N.T. & more?", ""), &cleaner);
        assert!(links.spotify.contains("AC%2FDC"));
        assert!(links.spotify.contains("%26"));
        assert!(links.spotify.contains("%3F"));
    }
}
