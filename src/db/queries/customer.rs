//! Customer database queries

use sqlx::PgPool;
use anyhow::Result;

use crate::types::Customer;

/// Find a customer by the UID of the source system
pub async fn find_by_external_id(pool: &PgPool, external_id: &str) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, external_id, name, address, contact_person, email, phone,
               created_at, updated_at
        FROM customers
        WHERE external_id = $1
        "#
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

/// Insert a new customer
pub async fn insert_customer(pool: &PgPool, customer: &Customer) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (
            id, external_id, name, address, contact_person, email, phone, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#
    )
    .bind(customer.id)
    .bind(&customer.external_id)
    .bind(&customer.name)
    .bind(&customer.address)
    .bind(&customer.contact_person)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(customer.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back all mutable fields of a customer
pub async fn update_customer(pool: &PgPool, customer: &Customer) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE customers SET
            name = $2,
            address = $3,
            contact_person = $4,
            email = $5,
            phone = $6,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(customer.id)
    .bind(&customer.name)
    .bind(&customer.address)
    .bind(&customer.contact_person)
    .bind(&customer.email)
    .bind(&customer.phone)
    .execute(pool)
    .await?;

    Ok(())
}
