use std::collections::HashMap;

use potion::HtmlError;
use serde::Serialize;

use crate::{
    actions::{
        ingredients::list_recipe_parts,
        recipes::{count_author_recipes, list_author_recipes, list_recipe_flags},
        tags::list_recipe_tags,
        users::list_profiles,
    },
    codec::image::MediaStore,
    schema::{AuthorRecipe, Recipe, RecipeFlags, RecipePart, Tag, User, UserProfile, Uuid},
};

use super::context::Context;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserView {
    pub fn new(profile: UserProfile, media: &MediaStore) -> Self {
        Self {
            email: profile.email,
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            is_subscribed: profile.is_subscribed,
            avatar: profile.avatar.map(|avatar| media.url(&avatar)),
        }
    }
}

/// Answer to a registration, without viewer dependent fields.
#[derive(Serialize, Debug)]
pub struct RegisteredUserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUserView {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct AvatarView {
    pub avatar: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientInRecipeView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for IngredientInRecipeView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientInRecipeView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeShortView {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShortView {
    pub fn new(recipe: &Recipe, media: &MediaStore) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }

    fn from_author_recipe(recipe: AuthorRecipe, media: &MediaStore) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// What a short link resolves to.
#[derive(Serialize, Debug)]
pub struct ResolvedLinkView {
    pub id: Uuid,
    pub name: String,
    pub text: String,
}

#[derive(Serialize, Debug)]
pub struct ShortLinkView {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

#[derive(Serialize, Debug)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: i64,
}

/// Groups `rows` per key, keeping their order.
fn group_by<T, F>(rows: Vec<T>, key: F) -> HashMap<Uuid, Vec<T>>
where
    F: Fn(&T) -> Uuid,
{
    let mut groups: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

fn unique_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Full recipe representations, loaded with one query per relation whatever the number of recipes.
pub async fn recipe_views(
    context: &Context,
    recipes: Vec<Recipe>,
    viewer: Option<Uuid>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let pool = &context.pool;
    let recipe_ids = unique_ids(recipes.iter().map(|recipe| recipe.id));
    let author_ids = unique_ids(recipes.iter().map(|recipe| recipe.author_id));

    let mut tags = group_by(list_recipe_tags(pool, &recipe_ids).await?, |tag| tag.recipe_id);
    let mut parts = group_by(list_recipe_parts(pool, &recipe_ids).await?, |part| {
        part.recipe_id
    });
    let flags: HashMap<Uuid, RecipeFlags> = match viewer {
        Some(viewer) => list_recipe_flags(pool, &recipe_ids, viewer)
            .await?
            .into_iter()
            .map(|flags| (flags.recipe_id, flags))
            .collect(),
        None => HashMap::new(),
    };
    let authors: HashMap<Uuid, UserProfile> = list_profiles(pool, &author_ids, viewer)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    recipes
        .into_iter()
        .map(|recipe| -> Result<RecipeView, potion::Error> {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                log::error!("Author {} of recipe {} is missing", recipe.author_id, recipe.id);
                HtmlError::InternalServerError.new("Recipe author missing")
            })?;
            let flags = flags.get(&recipe.id).copied().unwrap_or_default();

            Ok(RecipeView {
                id: recipe.id,
                tags: tags
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Tag::from)
                    .collect(),
                author: UserView::new(author, &context.media),
                ingredients: parts
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(IngredientInRecipeView::from)
                    .collect(),
                is_favorited: flags.is_favorited,
                is_in_shopping_cart: flags.is_in_shopping_cart,
                image: context.media.url(&recipe.image),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn recipe_view(
    context: &Context,
    recipe: Recipe,
    viewer: Option<Uuid>,
) -> Result<RecipeView, potion::Error> {
    recipe_views(context, vec![recipe], viewer)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::InternalServerError.new("Recipe vanished"))
}

/// Followed authors with their newest recipes, `recipes_limit` of them at most.
pub async fn subscription_views(
    context: &Context,
    authors: Vec<UserProfile>,
    recipes_limit: Option<i64>,
) -> Result<Vec<SubscriptionView>, potion::Error> {
    if authors.is_empty() {
        return Ok(vec![]);
    }

    let author_ids = unique_ids(authors.iter().map(|author| author.id));
    let mut recipes = group_by(
        list_author_recipes(&context.pool, &author_ids, recipes_limit).await?,
        |recipe| recipe.author_id,
    );
    let counts: HashMap<Uuid, i64> = count_author_recipes(&context.pool, &author_ids)
        .await?
        .into_iter()
        .map(|count| (count.author_id, count.recipes_count))
        .collect();

    Ok(authors
        .into_iter()
        .map(|author| {
            let id = author.id;
            SubscriptionView {
                author: UserView::new(author, &context.media),
                recipes: recipes
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|recipe| RecipeShortView::from_author_recipe(recipe, &context.media))
                    .collect(),
                recipes_count: counts.get(&id).copied().unwrap_or(0),
            }
        })
        .collect())
}
