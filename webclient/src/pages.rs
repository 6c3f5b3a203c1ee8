use seed::Url;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Page {
    Home,
    Radio,
}

impl Page {
    pub fn path(&self) -> Vec<&str> {
        match self {
            Page::Home => vec![],
            Page::Radio => vec!["radio"],
        }
    }

    pub fn from_url(url: Url) -> Option<Page> {
        Page::from_path(
            url.hash()
                .map(String::as_str)
                .unwrap_or_default()
                .split('/')
                .collect::<Vec<&str>>(),
        )
    }

    pub fn from_path(path: Vec<&str>) -> Option<Page> {
        match path[..] {
            [""] => Some(Page::Home),
            ["radio"] | ["radio", ""] => Some(Page::Radio),
            _ => None,
        }
    }

    pub fn url(self) -> Url {
        self.path()
            .into_iter()
            .fold(Url::new(), |url, part| url.add_hash_path_part(part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_path() {
        assert_eq!(Page::from_path(vec![""]), Some(Page::Home));
        assert_eq!(Page::from_path(vec!["radio"]), Some(Page::Radio));
        assert_eq!(Page::from_path(vec!["radio", ""]), Some(Page::Radio));
    }

    #[test]
    fn test_page_from_url() {
        let path: Vec<Url> = vec![
            Url::new().add_hash_path_part("thisshouldfail"),
            Url::new().add_hash_path_part("radio"),
            Url::new(),
        ];
        assert_eq!(
            path.iter()
                .map(|x| Page::from_url(x.to_owned()))
                .collect::<Vec<Option<Page>>>(),
            vec![None, Some(Page::Radio), Some(Page::Home)]
        )
    }

    #[test]
    fn test_page_path() {
        let empty: Vec<&str> = vec![];
        let pages = vec![Page::Home, Page::Radio];
        assert_eq!(
            pages.iter().map(Page::path).collect::<Vec<Vec<&str>>>(),
            vec![empty, vec!["radio"]]
        )
    }

    #[test]
    fn test_page_url_round_trip() {
        assert_eq!(Page::from_url(Page::Radio.url()), Some(Page::Radio));
        assert_eq!(Page::from_url(Page::Home.url()), Some(Page::Home));
    }
}
