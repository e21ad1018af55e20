use marquee_shared::{Booking, EmailNotification, Show, User};

/// Compose the confirmation notification handed to the external mail
/// collaborator once a booking is paid. Delivery, branding and full template
/// content live on that side; we only supply the facts of the booking.
pub fn confirmation_email(booking: &Booking, show: &Show, user: &User) -> EmailNotification {
    let seats = booking.seats.join(", ");
    let subject = format!("Payment Confirmation: \"{}\" booked!", show.movie_title);
    let body = format!(
        "<p>Hi <strong>{name}</strong>,</p>\
         <p>Your ticket for <strong>\"{title}\"</strong> has been confirmed.</p>\
         <p>Date: {date}<br/>Time: {time}<br/>Seats: {seats}</p>\
         <p>Enjoy the show!</p>",
        name = user.name,
        title = show.movie_title,
        date = show.starts_at.format("%B %e, %Y"),
        time = show.starts_at.format("%H:%M"),
        seats = seats,
    );

    EmailNotification {
        to: user.email.as_inner().clone(),
        subject,
        body,
    }
}
