use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{Product, ProductPage, ProductQuery, SortBy},
};

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn find_by_slugs(pool: &PgPool, slugs: &[String]) -> Result<HashMap<String, Product>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(pool)
        .await?;

    Ok(products
        .into_iter()
        .map(|product| (product.slug.clone(), product))
        .collect())
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ProductQuery) {
    let categories = params.categories();
    if !categories.is_empty() {
        query.push(" AND category = ANY(");
        query.push_bind(categories);
        query.push(")");
    }

    // text search
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    // price range
    if let Some(min_price) = params.min_price {
        query.push(" AND price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = params.max_price {
        query.push(" AND price <= ");
        query.push_bind(max_price);
    }

    let sizes = params.sizes();
    if !sizes.is_empty() {
        query.push(" AND sizes && ");
        query.push_bind(sizes);
    }

    let colors = params.colors();
    if !colors.is_empty() {
        query.push(" AND colors && ");
        query.push_bind(colors);
    }

    if let Some(rating) = params.rating {
        query.push(" AND rating >= ");
        query.push_bind(rating);
    }
}

pub async fn search_products(pool: &PgPool, params: &ProductQuery) -> Result<ProductPage> {
    let limit = params.page_limit();
    let offset = params.page_offset();

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
    push_filters(&mut query, params);

    // sort
    query.push(match params.sort {
        Some(SortBy::PriceAsc) => " ORDER BY price ASC",
        Some(SortBy::PriceDesc) => " ORDER BY price DESC",
        Some(SortBy::Rating) => " ORDER BY rating DESC",
        Some(SortBy::Popular) => " ORDER BY reviews DESC",
        Some(SortBy::Newest) | None => " ORDER BY created_at DESC",
    });
    query.push(", slug ASC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    let mut count: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
    push_filters(&mut count, params);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok(ProductPage {
        products,
        total,
        limit,
        offset,
    })
}
