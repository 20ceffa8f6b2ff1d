use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::TypeError,
    form::Form,
    pagination::PageRequest,
    schema::Uuid,
};

/// Recipe list filters read from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// Tag slugs, a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        Ok(Self {
            author: form.get_number("author")?,
            tags: form
                .get_all("tags")
                .into_iter()
                .filter(|slug| !slug.is_empty())
                .collect(),
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
        })
    }

    pub fn page_query(
        &self,
        viewer: Option<Uuid>,
        page: &PageRequest,
    ) -> QueryBuilder<'static, Postgres> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

        if let Some(author) = self.author {
            query.push(" AND r.author_id = ").push_bind(author);
        }

        if !self.tags.is_empty() {
            query
                .push(
                    " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                     WHERE rt.recipe_id = r.id AND t.slug = ANY(",
                )
                .push_bind(self.tags.clone())
                .push("))");
        }

        push_membership(&mut query, "favorites", self.is_favorited, viewer);
        push_membership(&mut query, "shopping_cart", self.is_in_shopping_cart, viewer);

        query
            .push(" ORDER BY r.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        query
    }
}

// Only a set flag narrows the list; anonymous viewers have empty collections.
fn push_membership(
    query: &mut QueryBuilder<'static, Postgres>,
    table: &'static str,
    flag: Option<bool>,
    viewer: Option<Uuid>,
) {
    if flag != Some(true) {
        return;
    }

    match viewer {
        Some(user_id) => {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {table} m WHERE m.recipe_id = r.id AND m.user_id = "
                ))
                .push_bind(user_id)
                .push(")");
        }
        None => {
            query.push(" AND FALSE");
        }
    }
}

/// Escapes `LIKE` wildcards so user input only ever matches literally.
pub fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
