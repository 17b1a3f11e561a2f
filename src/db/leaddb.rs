use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{
    db::db::{page_offset, DBClient},
    dtos::leaddtos::{
        CreateFranchiseApplicationDto, CreateListingLeadDto, CreateReviewDto, CreateTestimonialDto,
    },
    models::leadmodel::{
        AgentLead, ContactMessage, FranchiseApplication, ListingLead, ModerationStatus, Review,
        Testimonial, Visit, VisitStatus,
    },
};

const VISIT_COLUMNS: &str = r#"
    id, property_id, agent_id, visitor_name, visitor_email, visitor_phone,
    visit_date, visit_time, message, status, created_at
"#;

const REVIEW_COLUMNS: &str = r#"
    id, agent_id, reviewer_name, reviewer_email, rating, comment, status, created_at
"#;

const TESTIMONIAL_COLUMNS: &str = r#"
    id, author_name, author_role, content, rating, status, created_at
"#;

pub struct NewAgentLead {
    pub agent_id: Uuid,
    pub property_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

pub struct NewVisit {
    pub property_id: Uuid,
    pub agent_id: Uuid,
    pub visitor_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub message: Option<String>,
}

pub struct NewContactMessage {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RatingSummary {
    pub review_count: i64,
    pub average_rating: Option<f64>,
}

#[async_trait]
pub trait LeadExt {
    async fn create_listing_lead(&self, lead: CreateListingLeadDto) -> Result<ListingLead, sqlx::Error>;

    async fn get_listing_leads(&self, page: u32, limit: usize) -> Result<Vec<ListingLead>, sqlx::Error>;

    async fn create_agent_lead(&self, lead: NewAgentLead) -> Result<AgentLead, sqlx::Error>;

    async fn get_agent_leads(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<AgentLead>, sqlx::Error>;

    async fn create_visit(&self, visit: NewVisit) -> Result<Visit, sqlx::Error>;

    async fn get_visit(&self, visit_id: Uuid) -> Result<Option<Visit>, sqlx::Error>;

    async fn get_agent_visits(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Visit>, sqlx::Error>;

    /// Moves a visit out of `pending`. `None` when it was already answered.
    async fn answer_visit(&self, visit_id: Uuid, status: VisitStatus) -> Result<Option<Visit>, sqlx::Error>;

    async fn create_review(&self, review: CreateReviewDto) -> Result<Review, sqlx::Error>;

    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, sqlx::Error>;

    async fn get_reviews_by_status(
        &self,
        status: ModerationStatus,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Review>, sqlx::Error>;

    async fn get_approved_reviews_for_agent(&self, agent_id: Uuid) -> Result<Vec<Review>, sqlx::Error>;

    async fn get_agent_rating_summary(&self, agent_id: Uuid) -> Result<RatingSummary, sqlx::Error>;

    async fn set_review_status(
        &self,
        review_id: Uuid,
        status: ModerationStatus,
    ) -> Result<Option<Review>, sqlx::Error>;

    async fn create_testimonial(&self, testimonial: CreateTestimonialDto) -> Result<Testimonial, sqlx::Error>;

    async fn get_testimonials_by_status(
        &self,
        status: ModerationStatus,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Testimonial>, sqlx::Error>;

    async fn set_testimonial_status(
        &self,
        testimonial_id: Uuid,
        status: ModerationStatus,
    ) -> Result<Option<Testimonial>, sqlx::Error>;

    async fn create_franchise_application(
        &self,
        application: CreateFranchiseApplicationDto,
    ) -> Result<FranchiseApplication, sqlx::Error>;

    async fn get_franchise_applications(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<FranchiseApplication>, sqlx::Error>;

    async fn create_contact_message(&self, message: NewContactMessage) -> Result<ContactMessage, sqlx::Error>;
}

#[async_trait]
impl LeadExt for DBClient {
    async fn create_listing_lead(&self, lead: CreateListingLeadDto) -> Result<ListingLead, sqlx::Error> {
        sqlx::query_as::<_, ListingLead>(
            r#"
            INSERT INTO listing_leads (
                full_name, email, phone, property_address, property_type, transaction_type, message
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(lead.full_name)
        .bind(lead.email)
        .bind(lead.phone)
        .bind(lead.property_address)
        .bind(lead.property_type)
        .bind(lead.transaction_type)
        .bind(lead.message)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_listing_leads(&self, page: u32, limit: usize) -> Result<Vec<ListingLead>, sqlx::Error> {
        sqlx::query_as::<_, ListingLead>(
            "SELECT * FROM listing_leads ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn create_agent_lead(&self, lead: NewAgentLead) -> Result<AgentLead, sqlx::Error> {
        sqlx::query_as::<_, AgentLead>(
            r#"
            INSERT INTO agent_leads (agent_id, property_id, full_name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(lead.agent_id)
        .bind(lead.property_id)
        .bind(lead.full_name)
        .bind(lead.email)
        .bind(lead.phone)
        .bind(lead.message)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_agent_leads(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<AgentLead>, sqlx::Error> {
        sqlx::query_as::<_, AgentLead>(
            r#"
            SELECT * FROM agent_leads WHERE agent_id = $1
            ORDER BY created_at DESC LIMIT $2 OFFSET $3
            "#,
        )
        .bind(agent_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn create_visit(&self, visit: NewVisit) -> Result<Visit, sqlx::Error> {
        sqlx::query_as::<_, Visit>(&format!(
            r#"
            INSERT INTO visits (
                property_id, agent_id, visitor_name, visitor_email, visitor_phone,
                visit_date, visit_time, message, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {VISIT_COLUMNS}
            "#
        ))
        .bind(visit.property_id)
        .bind(visit.agent_id)
        .bind(visit.visitor_name)
        .bind(visit.visitor_email)
        .bind(visit.visitor_phone)
        .bind(visit.visit_date)
        .bind(visit.visit_time)
        .bind(visit.message)
        .bind(VisitStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_visit(&self, visit_id: Uuid) -> Result<Option<Visit>, sqlx::Error> {
        sqlx::query_as::<_, Visit>(&format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"))
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_agent_visits(
        &self,
        agent_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Visit>, sqlx::Error> {
        sqlx::query_as::<_, Visit>(&format!(
            r#"
            SELECT {VISIT_COLUMNS} FROM visits WHERE agent_id = $1
            ORDER BY visit_date ASC, visit_time ASC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(agent_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn answer_visit(&self, visit_id: Uuid, status: VisitStatus) -> Result<Option<Visit>, sqlx::Error> {
        sqlx::query_as::<_, Visit>(&format!(
            "UPDATE visits SET status = $1 WHERE id = $2 AND status = $3 RETURNING {VISIT_COLUMNS}"
        ))
        .bind(status)
        .bind(visit_id)
        .bind(VisitStatus::Pending)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_review(&self, review: CreateReviewDto) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (agent_id, reviewer_name, reviewer_email, rating, comment, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.agent_id)
        .bind(review.reviewer_name)
        .bind(review.reviewer_email)
        .bind(review.rating)
        .bind(review.comment)
        .bind(ModerationStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_reviews_by_status(
        &self,
        status: ModerationStatus,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews WHERE status = $1
            ORDER BY created_at DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_approved_reviews_for_agent(&self, agent_id: Uuid) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE agent_id = $1 AND status = 'approved'
            ORDER BY created_at DESC
            "#
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_agent_rating_summary(&self, agent_id: Uuid) -> Result<RatingSummary, sqlx::Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT COUNT(*) AS review_count, AVG(rating)::float8 AS average_rating
            FROM reviews WHERE agent_id = $1 AND status = 'approved'
            "#,
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_review_status(
        &self,
        review_id: Uuid,
        status: ModerationStatus,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET status = $1 WHERE id = $2 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(status)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_testimonial(&self, testimonial: CreateTestimonialDto) -> Result<Testimonial, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(&format!(
            r#"
            INSERT INTO testimonials (author_name, author_role, content, rating, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        ))
        .bind(testimonial.author_name)
        .bind(testimonial.author_role)
        .bind(testimonial.content)
        .bind(testimonial.rating)
        .bind(ModerationStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_testimonials_by_status(
        &self,
        status: ModerationStatus,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Testimonial>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(&format!(
            r#"
            SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE status = $1
            ORDER BY created_at DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn set_testimonial_status(
        &self,
        testimonial_id: Uuid,
        status: ModerationStatus,
    ) -> Result<Option<Testimonial>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(&format!(
            "UPDATE testimonials SET status = $1 WHERE id = $2 RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(status)
        .bind(testimonial_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_franchise_application(
        &self,
        application: CreateFranchiseApplicationDto,
    ) -> Result<FranchiseApplication, sqlx::Error> {
        sqlx::query_as::<_, FranchiseApplication>(
            r#"
            INSERT INTO franchise_applications (
                full_name, email, phone, city, investment_capacity, experience, message, document_urls
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(application.full_name)
        .bind(application.email)
        .bind(application.phone)
        .bind(application.city)
        .bind(application.investment_capacity)
        .bind(application.experience)
        .bind(application.message)
        .bind(application.document_urls)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_franchise_applications(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<FranchiseApplication>, sqlx::Error> {
        sqlx::query_as::<_, FranchiseApplication>(
            "SELECT * FROM franchise_applications ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn create_contact_message(&self, message: NewContactMessage) -> Result<ContactMessage, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (full_name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(message.full_name)
        .bind(message.email)
        .bind(message.phone)
        .bind(message.subject)
        .bind(message.message)
        .fetch_one(&self.pool)
        .await
    }
}
