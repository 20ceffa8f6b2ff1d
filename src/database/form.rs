use std::str::FromStr;

use super::error::TypeError;

/// Raw query pairs, in order, repeated keys kept.
pub type FormData = Vec<(String, String)>;

#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("{key} must be a number"))),
            None => Ok(None),
        }
    }

    pub fn get_flag(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.get_str(key) {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                _ => Err(TypeError::new(&format!("{key} must be a boolean"))),
            },
            None => Ok(None),
        }
    }

    /// Every pair except the given keys, used to carry filters over into page links.
    pub fn pairs_without(&self, keys: &[&str]) -> FormData {
        self.inner
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_keys_are_kept() {
        let form = form(&[("tags", "lunch"), ("page", "2"), ("tags", "dinner")]);

        assert_eq!(form.get_all("tags"), vec!["lunch", "dinner"]);
        assert_eq!(form.get_str("tags"), Some("lunch"));
        assert_eq!(
            form.pairs_without(&["page"]),
            vec![
                (String::from("tags"), String::from("lunch")),
                (String::from("tags"), String::from("dinner"))
            ]
        );
    }

    #[test]
    fn numbers_and_flags() {
        let form = form(&[("limit", "3"), ("is_favorited", "1"), ("author", "x")]);

        assert_eq!(form.get_number::<i64>("limit").ok(), Some(Some(3)));
        assert_eq!(form.get_number::<i64>("page").ok(), Some(None));
        assert!(form.get_number::<i32>("author").is_err());
        assert_eq!(form.get_flag("is_favorited").ok(), Some(Some(true)));
        assert_eq!(form.get_flag("is_in_shopping_cart").ok(), Some(None));
    }
}
