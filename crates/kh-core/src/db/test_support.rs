//! Fixtures shared by the repository tests.

use super::{
    create_article_repository, create_category_repository, create_employee_repository,
    create_knowledge_base_repository, create_pool, run_migrations, DbPool,
};
use crate::models::{Article, Category, Employee, KnowledgeBase};
use uuid::Uuid;

/// Throwaway hash; repository tests never verify passwords.
const TEST_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo";

pub(crate) async fn memory_pool() -> DbPool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub(crate) async fn seed_employee(pool: &DbPool, username: &str, superuser: bool) -> Employee {
    let mut employee = Employee::new(
        username,
        format!("{}@example.com", username),
        TEST_HASH,
        "Engineer",
    );
    employee.is_superuser = superuser;
    create_employee_repository(pool)
        .create(&employee)
        .await
        .unwrap()
}

pub(crate) async fn seed_knowledge_base(pool: &DbPool, title: &str) -> KnowledgeBase {
    create_knowledge_base_repository(pool)
        .create(&KnowledgeBase::new(title, None))
        .await
        .unwrap()
}

pub(crate) async fn seed_category(
    pool: &DbPool,
    topic: &str,
    knowledge_base_id: Uuid,
    created_by: Option<Uuid>,
) -> Category {
    create_category_repository(pool)
        .create(&Category::new(topic, knowledge_base_id, created_by))
        .await
        .unwrap()
}

pub(crate) async fn seed_article(
    pool: &DbPool,
    title: &str,
    author_id: Uuid,
    category_id: Uuid,
    published: bool,
) -> Article {
    seed_article_with_content(
        pool,
        title,
        "Some content",
        author_id,
        category_id,
        published,
    )
    .await
}

pub(crate) async fn seed_article_with_content(
    pool: &DbPool,
    title: &str,
    content: &str,
    author_id: Uuid,
    category_id: Uuid,
    published: bool,
) -> Article {
    create_article_repository(pool)
        .create(&Article::new(title, content, author_id, category_id, published))
        .await
        .unwrap()
}
