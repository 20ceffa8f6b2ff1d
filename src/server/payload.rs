use std::collections::HashSet;

use serde::Deserialize;

use crate::{
    codec::image::{decode_data_url, DecodedImage, INVALID_IMAGE},
    constants::{
        EMAIL_MAX_LENGTH, MIN_AMOUNT, MIN_COOKING_TIME, NAME_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH,
    },
    error::FieldErrors,
    schema::{RecipePartNoName, Uuid},
};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const EMPTY: &str = "This field may not be empty.";

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

fn too_small(min: i32) -> String {
    format!("Ensure this value is greater than or equal to {min}.")
}

/// Required, non blank text of at most `max` characters.
fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    optional_text(errors, field, value, max)
}

fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: String,
    max: Option<usize>,
) -> Option<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(field, &too_long(max));
            return None;
        }
    }
    Some(value)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginPayload {
    pub fn validate(self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = required_text(&mut errors, "email", self.email, None);
        let password = match self.password {
            Some(password) if !password.is_empty() => Some(password),
            Some(_) => {
                errors.add("password", BLANK);
                None
            }
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterPayload {
    pub fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = required_text(&mut errors, "email", self.email, Some(EMAIL_MAX_LENGTH))
            .filter(|email| {
                let valid = is_valid_email(email);
                if !valid {
                    errors.add("email", "Enter a valid email address.");
                }
                valid
            });

        let username =
            required_text(&mut errors, "username", self.username, Some(NAME_MAX_LENGTH)).filter(
                |username| {
                    if !is_valid_username(username) {
                        errors.add(
                            "username",
                            "Enter a valid username. This value may contain only letters, \
                             numbers, and @/./+/-/_ characters.",
                        );
                        return false;
                    }
                    if username == "me" {
                        errors.add("username", "This username is reserved.");
                        return false;
                    }
                    true
                },
            );

        let first_name =
            required_text(&mut errors, "first_name", self.first_name, Some(NAME_MAX_LENGTH));
        let last_name =
            required_text(&mut errors, "last_name", self.last_name, Some(NAME_MAX_LENGTH));
        let password = match self.password {
            Some(password) if !password.is_empty() => Some(password),
            Some(_) => {
                errors.add("password", BLANK);
                None
            }
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };

        match (email, username, first_name, last_name, password) {
            (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
                if errors.is_empty() =>
            {
                Ok(NewUser {
                    email,
                    username,
                    first_name,
                    last_name,
                    password,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordPayload {
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub current_password: Option<String>,
}

impl SetPasswordPayload {
    pub fn validate(self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut take = |field: &str, value: Option<String>| match value {
            Some(value) if !value.is_empty() => Some(value),
            Some(_) => {
                errors.add(field, BLANK);
                None
            }
            None => {
                errors.add(field, REQUIRED);
                None
            }
        };

        let current = take("current_password", self.current_password);
        let new = take("new_password", self.new_password);

        match (current, new) {
            (Some(current), Some(new)) => Ok((current, new)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvatarPayload {
    #[serde(default)]
    pub avatar: Option<String>,
}

impl AvatarPayload {
    pub fn validate(self) -> Result<DecodedImage, FieldErrors> {
        match self.avatar.filter(|avatar| !avatar.trim().is_empty()) {
            Some(avatar) => {
                decode_data_url(&avatar).map_err(|_e| FieldErrors::single("avatar", INVALID_IMAGE))
            }
            None => Err(FieldErrors::single("avatar", REQUIRED)),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IngredientAmountPayload {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    #[serde(default)]
    pub ingredients: Option<Vec<IngredientAmountPayload>>,
    #[serde(default)]
    pub tags: Option<Vec<Uuid>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<i32>,
}

/// Checked recipe fields; with a partial update any of them may be absent.
#[derive(Debug, Clone, Default)]
pub struct RecipeInput {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<RecipePartNoName>>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<RecipePartNoName>,
}

pub fn validate_tags(tags: &[Uuid]) -> Result<(), String> {
    if tags.is_empty() {
        return Err(EMPTY.to_string());
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = tags.iter().find(|id| !seen.insert(**id)) {
        return Err(format!("Tag {duplicate} is listed more than once."));
    }

    Ok(())
}

pub fn validate_ingredients(
    ingredients: &[IngredientAmountPayload],
) -> Result<Vec<RecipePartNoName>, Vec<String>> {
    if ingredients.is_empty() {
        return Err(vec![EMPTY.to_string()]);
    }

    let mut messages = vec![];
    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            messages.push(format!(
                "Ingredient {} is listed more than once.",
                ingredient.id
            ));
        }
        if ingredient.amount < MIN_AMOUNT {
            messages.push(format!(
                "Amount of ingredient {}: {}",
                ingredient.id,
                too_small(MIN_AMOUNT)
            ));
        }
    }

    if !messages.is_empty() {
        return Err(messages);
    }

    Ok(ingredients
        .iter()
        .map(|ingredient| RecipePartNoName {
            ingredient_id: ingredient.id,
            amount: ingredient.amount,
        })
        .collect())
}

impl RecipePayload {
    /// Every field is checked when present; `partial` decides whether absence is an error.
    pub fn validate(self, partial: bool) -> Result<RecipeInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let missing = |errors: &mut FieldErrors, field: &str, present: bool| {
            if !partial && !present {
                errors.add(field, REQUIRED);
            }
        };

        missing(&mut errors, "name", self.name.is_some());
        missing(&mut errors, "text", self.text.is_some());
        missing(&mut errors, "cooking_time", self.cooking_time.is_some());
        missing(&mut errors, "image", self.image.is_some());
        missing(&mut errors, "tags", self.tags.is_some());
        missing(&mut errors, "ingredients", self.ingredients.is_some());

        let name = self
            .name
            .and_then(|name| optional_text(&mut errors, "name", name, Some(RECIPE_NAME_MAX_LENGTH)));
        let text = self
            .text
            .and_then(|text| optional_text(&mut errors, "text", text, None));

        let cooking_time = self.cooking_time.filter(|time| {
            if *time < MIN_COOKING_TIME {
                errors.add("cooking_time", &too_small(MIN_COOKING_TIME));
                return false;
            }
            true
        });

        let image = match self.image {
            Some(image) => match decode_data_url(&image) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::debug!("Rejected recipe image: {e}");
                    errors.add("image", INVALID_IMAGE);
                    None
                }
            },
            None => None,
        };

        let tags = match self.tags {
            Some(tags) => match validate_tags(&tags) {
                Ok(()) => Some(tags),
                Err(message) => {
                    errors.add("tags", &message);
                    None
                }
            },
            None => None,
        };

        let ingredients = match self.ingredients {
            Some(ingredients) => match validate_ingredients(&ingredients) {
                Ok(parts) => Some(parts),
                Err(messages) => {
                    for message in messages {
                        errors.add("ingredients", &message);
                    }
                    None
                }
            },
            None => None,
        };

        errors.into_result()?;

        Ok(RecipeInput {
            name,
            text,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }

    pub fn validate_new(self) -> Result<NewRecipe, FieldErrors> {
        let RecipeInput {
            name: Some(name),
            text: Some(text),
            cooking_time: Some(cooking_time),
            image: Some(image),
            tags: Some(tags),
            ingredients: Some(ingredients),
        } = self.validate(false)?
        else {
            return Err(FieldErrors::single("non_field_errors", REQUIRED));
        };

        Ok(NewRecipe {
            name,
            text,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn ingredient(id: Uuid, amount: i32) -> IngredientAmountPayload {
        IngredientAmountPayload { id, amount }
    }

    fn recipe() -> RecipePayload {
        RecipePayload {
            ingredients: Some(vec![ingredient(1, 10), ingredient(2, 20)]),
            tags: Some(vec![1, 2]),
            image: Some(PIXEL.to_string()),
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(15),
        }
    }

    #[test]
    fn complete_recipe_is_accepted() {
        let Ok(recipe) = recipe().validate_new() else {
            panic!("recipe rejected");
        };

        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.image.extension, "png");
        assert_eq!(
            recipe.ingredients,
            vec![
                RecipePartNoName { ingredient_id: 1, amount: 10 },
                RecipePartNoName { ingredient_id: 2, amount: 20 },
            ]
        );
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut payload = recipe();
        payload.tags = Some(vec![1, 2, 1]);

        let Err(errors) = payload.validate(false) else {
            panic!("duplicate tags accepted");
        };
        assert_eq!(errors.get("tags").map(|m| m.len()), Some(1));
        assert!(errors.get("ingredients").is_none());
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let mut payload = recipe();
        payload.ingredients = Some(vec![ingredient(3, 1), ingredient(3, 5)]);

        let Err(errors) = payload.validate(false) else {
            panic!("duplicate ingredients accepted");
        };
        assert!(errors.get("ingredients").is_some());
    }

    #[rstest]
    #[case(vec![], true)]
    #[case(vec![ingredient(1, 0)], true)]
    #[case(vec![ingredient(1, -3)], true)]
    #[case(vec![ingredient(1, 1)], false)]
    fn ingredient_lists(#[case] ingredients: Vec<IngredientAmountPayload>, #[case] rejected: bool) {
        assert_eq!(validate_ingredients(&ingredients).is_err(), rejected);
    }

    #[test]
    fn empty_tags_are_rejected() {
        assert_eq!(validate_tags(&[]), Err(EMPTY.to_string()));
        assert!(validate_tags(&[4]).is_ok());
    }

    #[test]
    fn create_requires_every_field() {
        let Err(errors) = RecipePayload::default().validate(false) else {
            panic!("empty recipe accepted");
        };

        for field in ["name", "text", "cooking_time", "image", "tags", "ingredients"] {
            assert_eq!(errors.get(field), Some(&[REQUIRED.to_string()][..]), "{field}");
        }
    }

    #[test]
    fn partial_update_checks_present_fields_only() {
        let Ok(input) = RecipePayload {
            cooking_time: Some(5),
            ..Default::default()
        }
        .validate(true) else {
            panic!("partial update rejected");
        };
        assert_eq!(input.cooking_time, Some(5));
        assert!(input.tags.is_none());

        let Err(errors) = RecipePayload {
            cooking_time: Some(0),
            tags: Some(vec![]),
            ..Default::default()
        }
        .validate(true) else {
            panic!("invalid update accepted");
        };
        assert!(errors.get("cooking_time").is_some());
        assert!(errors.get("tags").is_some());
    }

    #[test]
    fn bad_image_is_a_field_error() {
        let mut payload = recipe();
        payload.image = Some(String::from("data:image/png;base64,bm90IGFuIGltYWdl"));

        let Err(errors) = payload.validate(false) else {
            panic!("bad image accepted");
        };
        assert_eq!(errors.get("image"), Some(&[INVALID_IMAGE.to_string()][..]));
    }

    #[test]
    fn long_recipe_name_is_rejected() {
        let mut payload = recipe();
        payload.name = Some("a".repeat(RECIPE_NAME_MAX_LENGTH + 1));

        assert!(payload.validate(false).is_err());
    }

    #[rstest]
    #[case("cook@example.com", true)]
    #[case("cook@mail.example.org", true)]
    #[case("cook@example", false)]
    #[case("cook example@example.com", false)]
    #[case("@example.com", false)]
    #[case("cook@.com", false)]
    fn emails(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(is_valid_email(email), valid);
    }

    fn registration() -> RegisterPayload {
        RegisterPayload {
            email: Some(String::from("cook@example.com")),
            username: Some(String::from("cook.42")),
            first_name: Some(String::from("Jamie")),
            last_name: Some(String::from("Oliver")),
            password: Some(String::from("MySecretPas$word")),
        }
    }

    #[test]
    fn registration_is_trimmed_and_accepted() {
        let mut payload = registration();
        payload.first_name = Some(String::from("  Jamie "));

        let Ok(user) = payload.validate() else {
            panic!("registration rejected");
        };
        assert_eq!(user.first_name, "Jamie");
        assert_eq!(user.username, "cook.42");
    }

    #[rstest]
    #[case("me")]
    #[case("cook!")]
    #[case("")]
    fn bad_usernames(#[case] username: &str) {
        let mut payload = registration();
        payload.username = Some(username.to_string());

        let Err(errors) = payload.validate() else {
            panic!("username {username:?} accepted");
        };
        assert!(errors.get("username").is_some());
    }

    #[test]
    fn registration_reports_every_missing_field() {
        let payload = RegisterPayload {
            email: None,
            username: None,
            first_name: None,
            last_name: None,
            password: None,
        };

        let Err(errors) = payload.validate() else {
            panic!("empty registration accepted");
        };
        for field in ["email", "username", "first_name", "last_name", "password"] {
            assert!(errors.get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn avatar_must_be_an_image() {
        assert!(AvatarPayload { avatar: Some(PIXEL.to_string()) }.validate().is_ok());
        assert!(AvatarPayload { avatar: None }.validate().is_err());
        assert!(AvatarPayload { avatar: Some(String::from("hello")) }.validate().is_err());
    }
}
