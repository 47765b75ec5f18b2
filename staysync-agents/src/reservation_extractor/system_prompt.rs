use shared_types::Platform;

const FIELD_SCHEMA: &str = r#"{
  "guest_name": string | null,
  "guest_phone": string | null,
  "guest_email": string | null,
  "reservation_number": string | null,
  "platform": ["Airbnb" | "Vrbo" | "HomeAway"],
  "check_in": "YYYY-MM-DD" | null,
  "check_out": "YYYY-MM-DD" | null,
  "booking_date": "YYYY-MM-DD" | null,
  "property": string | null,
  "adults": number | null,
  "children": number | null,
  "accommodation": number | null,
  "cleaning_fee": number | null,
  "guest_service_fee": number | null,
  "taxes": number | null,
  "damage_protection_fee": number | null,
  "discount": number | null,
  "resort_fee": number | null,
  "host_service_fee": number | null,
  "payment_processing_fee": number | "TBD" | null
}"#;

fn platform_notes(platform: Platform) -> &'static str {
    match platform {
        Platform::Airbnb => {
            r#"This is an Airbnb reservation confirmation, often forwarded by the host.
- The reservation number is the "Confirmation code", usually starting with "HM".
- "host_service_fee" is the "Host service fee" deducted from the host payout, as a positive number.
- "accommodation" is the nightly total before fees (e.g. "$150.00 x 3 nights" gives 450.00).
- Airbnb dates usually omit the year; use the reference year unless the stay clearly falls in the next one."#
        }
        Platform::Vrbo | Platform::HomeAway => {
            r##"This is a Vrbo / HomeAway booking confirmation.
- The reservation number usually starts with "HA-" or is a letter followed by digits.
- "property" is the property or listing number (e.g. "#3456633").
- "payment_processing_fee" is "TBD" when the email says the fee is still to be determined."##
        }
        Platform::Unknown => {
            "The booking platform is not known; infer it from the email content."
        }
    }
}

pub fn build_system_prompt(platform: Platform, reference_year: i32) -> String {
    format!(
        r#"You extract vacation rental reservation details from booking confirmation emails.

{notes}

## Output

Respond with a single flat JSON object and nothing else, using exactly these keys:

{schema}

## Rules

1. Use null for any value that is not present in the email. Never guess.
2. Monetary values are plain numbers in dollars without currency symbols or thousands separators.
3. Use "TBD" for payment_processing_fee only when the email states the fee is not yet known.
4. Dates are ISO formatted. The current year is {year}.
5. "platform" is always an array, even with one entry.
6. If the email is not a reservation confirmation, respond with {{"error": "not a reservation"}}."#,
        notes = platform_notes(platform),
        schema = FIELD_SCHEMA,
        year = reference_year,
    )
}

pub fn build_user_prompt(subject: &str, body: &str) -> String {
    format!("**Subject:** {subject}\n\n**Body:**\n{body}")
}
