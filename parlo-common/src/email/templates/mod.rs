use chrono::{DateTime, Utc};
use std::time::SystemTime;

pub const ACCOUNT_RECOVERY_TEMPLATE: &str = "account_recovery";

pub struct AccountRecoveryMessage {}

impl AccountRecoveryMessage {
    pub fn subject() -> &'static str {
        "Your Parlo account is scheduled for deletion"
    }

    pub fn generate(name: &str, scheduled_date: SystemTime, recovery_url: &str) -> String {
        let deadline = DateTime::<Utc>::from(scheduled_date)
            .format("%B %-d, %Y at %H:%M UTC")
            .to_string();

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>Parlo Account Deletion Notice</h1>
               <p>Hi {},</p>
               <p>Your Parlo account is scheduled for deletion on \
               <b>{}</b>.</p>
               <p>If you want to keep your account, recover it before then:</p>
               <p><a href=\"{}\" rel=\"nofollow\">Recover my account</a></p>
               <br />
               <p><i>If you requested this deletion, no action is needed.</i></p>
             </body>
             </html>",
            name, deadline, recovery_url,
        )
    }
}
