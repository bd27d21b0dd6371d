pub mod resend_client;
pub mod s3_client;
pub mod sendgrid_client;
pub mod unisender_client;
