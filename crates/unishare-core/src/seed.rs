// Starter catalog written into empty collections on first start.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Category, Listing, ListingType, Note, NoteFormat};

const DEMO_PDF_URL: &str = "https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf";

pub fn listings() -> Vec<Listing> {
    listings_at(Utc::now())
}

/// Seed listings with creation times relative to `now`.
pub fn listings_at(now: DateTime<Utc>) -> Vec<Listing> {
    vec![
        Listing {
            id: "1".into(),
            title: "Mini-Drafter (Grade A)".into(),
            description: "High-precision mini drafter for Engineering Graphics. Verified Grade A condition by UniShare AI.".into(),
            price: 850.0,
            listing_type: ListingType::Sell,
            price_per_day: None,
            return_date: None,
            security_deposit: None,
            category: Category::EngineeringGraphicsKits,
            department: "1st Year (General)".into(),
            owner: "Rahul Sharma".into(),
            owner_email: "rahul.s@bvuniversity.edu.in".into(),
            owner_karma: 145,
            image_url: "https://images.unsplash.com/photo-1581094794329-c8112a89af12?auto=format&fit=crop&w=400&h=300".into(),
            scan_video_url: None,
            honest_review: None,
            condition: "Excellent".into(),
            created_at: now - Duration::hours(1),
            carbon_saved: 1.6,
        },
        Listing {
            id: "2".into(),
            title: "Drawing Sheet Container (New)".into(),
            description: "Expandable waterproof container for A1/A2 sheets. Essential for civil and mech students.".into(),
            price: 350.0,
            listing_type: ListingType::Sell,
            price_per_day: None,
            return_date: None,
            security_deposit: None,
            category: Category::DrawingSheetContainers,
            department: "1st Year (General)".into(),
            owner: "Snehal T.".into(),
            owner_email: "snehal.t@bvuniversity.edu.in".into(),
            owner_karma: 42,
            image_url: "https://images.unsplash.com/photo-1513364235641-79a44005e133?auto=format&fit=crop&w=400&h=300".into(),
            scan_video_url: None,
            honest_review: None,
            condition: "New".into(),
            created_at: now - Duration::hours(3),
            carbon_saved: 0.3,
        },
        Listing {
            id: "3".into(),
            title: "E&TC Load Sensor (Industrial)".into(),
            description: "Precision load cell for weight-sensing projects. Used in TE final year automation project.".into(),
            price: 1200.0,
            listing_type: ListingType::Sell,
            price_per_day: None,
            return_date: None,
            security_deposit: None,
            category: Category::Sensors,
            department: "E&TC".into(),
            owner: "Priya Patil".into(),
            owner_email: "priya.p@bvuniversity.edu.in".into(),
            owner_karma: 88,
            image_url: "https://images.unsplash.com/photo-1518770660439-4636190af475?auto=format&fit=crop&w=400&h=300".into(),
            scan_video_url: None,
            honest_review: None,
            condition: "Good".into(),
            created_at: now - Duration::hours(4),
            carbon_saved: 0.8,
        },
    ]
}

/// Seed notes. All seeded authors are verified.
pub fn notes() -> Vec<Note> {
    vec![
        Note {
            id: "n1".into(),
            title: "Applied Mathematics - III (M3) Complete PDF".into(),
            subject: "M3".into(),
            department: "Computer".into(),
            semester: 3,
            author: "Prof. Deshmukh".into(),
            author_email: "admin@bvuniversity.edu.in".into(),
            is_author_verified: true,
            file_url: DEMO_PDF_URL.into(),
            format: NoteFormat::Digital,
            downloads: 145,
            summary: None,
        },
        Note {
            id: "n2".into(),
            title: "Data Structures & Algorithms Handwritten".into(),
            subject: "DSA".into(),
            department: "IT".into(),
            semester: 4,
            author: "Siddharth J.".into(),
            author_email: "siddharth@bvuniversity.edu.in".into(),
            is_author_verified: true,
            file_url: DEMO_PDF_URL.into(),
            format: NoteFormat::Physical,
            downloads: 89,
            summary: None,
        },
        Note {
            id: "n3".into(),
            title: "Microprocessor 8086 Instruction Set".into(),
            subject: "MP".into(),
            department: "E&TC".into(),
            semester: 5,
            author: "Library Scanned".into(),
            author_email: "admin@bvuniversity.edu.in".into(),
            is_author_verified: true,
            file_url: DEMO_PDF_URL.into(),
            format: NoteFormat::Digital,
            downloads: 210,
            summary: None,
        },
    ]
}
